//! Rule-based binary sentiment labeling for stock forum titles.
//!
//! Strong keywords decide first; if both strong lists hit, the post is
//! negative. Weak positive keywords are consulted only when no strong keyword
//! matched. Everything else is negative: the scale has no neutral class.

use crate::domain::ports::SentimentClassifier;
use crate::domain::sentiment::Polarity;

const STRONG_POSITIVE: &[&str] = &[
    "상한가", "급등", "폭등", "반등", "대박", "호재", "수익", "흑자", "기대", "좋다", "좋네",
    "가즈아", "가자", "우상향", "상승장", "불장", "축하", "축하합니다", "고맙다", "고마워",
    "신고가",
];

const STRONG_NEGATIVE: &[&str] = &[
    "폭락", "급락", "하락", "추락", "손실", "손절", "물렸다", "망함", "망했다", "휴지조각",
    "쓰레기", "개잡주", "사기", "공매도", "악재", "지옥", "멘붕", "최악", "양아치", "상폐",
    "상장폐지", "국장쓰레기", "거지같", "죽었다",
];

const WEAK_POSITIVE: &[&str] = &[
    "ㅋㅋ", "ㅎㅎ", "^^", "이득", "이득봤다", "기분좋", "좋구만", "오늘은웃는다",
];

/// Keyword lists driving [`KeywordSentimentClassifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordLexicon {
    pub strong_positive: Vec<String>,
    pub strong_negative: Vec<String>,
    pub weak_positive: Vec<String>,
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl Default for KeywordLexicon {
    fn default() -> Self {
        Self {
            strong_positive: owned(STRONG_POSITIVE),
            strong_negative: owned(STRONG_NEGATIVE),
            weak_positive: owned(WEAK_POSITIVE),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct KeywordSentimentClassifier {
    lexicon: KeywordLexicon,
}

impl KeywordSentimentClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lexicon(lexicon: KeywordLexicon) -> Self {
        Self { lexicon }
    }
}

fn hits(text: &str, words: &[String]) -> usize {
    words.iter().filter(|w| text.contains(w.as_str())).count()
}

impl SentimentClassifier for KeywordSentimentClassifier {
    fn classify(&self, text: &str) -> Polarity {
        // Board titles space words inconsistently
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let compact = compact.to_lowercase();

        let positive = hits(&compact, &self.lexicon.strong_positive);
        let negative = hits(&compact, &self.lexicon.strong_negative);
        match (positive > 0, negative > 0) {
            (true, false) => return Polarity::Positive,
            (_, true) => return Polarity::Negative,
            (false, false) => {}
        }

        if hits(&compact, &self.lexicon.weak_positive) > 0 {
            Polarity::Positive
        } else {
            Polarity::Negative
        }
    }
}
