//! The nine-stage step sequencer.
//!
//! Forward movement is gated per stage; backward movement is always
//! allowed. A blocked advance reports which required answers are
//! missing, in presentation order, so the UI can highlight and scroll
//! to the first one.

use crate::content::{
    self, COMPREHENSION_CORRECT_INDEX,
};
use crate::document::SurveyDocument;
use crate::text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Consent,
    Baseline,
    Instruction,
    Task,
    PostTaskA,
    PostTaskB,
    Authorship,
    Demographics,
    Debrief,
}

pub const STAGES: &[Stage] = &[
    Stage::Consent,
    Stage::Baseline,
    Stage::Instruction,
    Stage::Task,
    Stage::PostTaskA,
    Stage::PostTaskB,
    Stage::Authorship,
    Stage::Demographics,
    Stage::Debrief,
];

impl Stage {
    pub fn index(&self) -> usize {
        STAGES.iter().position(|s| s == self).unwrap_or(0)
    }

    pub fn from_index(index: usize) -> Option<Stage> {
        STAGES.get(index).copied()
    }

    pub fn next(&self) -> Option<Stage> {
        Stage::from_index(self.index() + 1)
    }

    pub fn prev(&self) -> Option<Stage> {
        self.index().checked_sub(1).and_then(Stage::from_index)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Stage::Consent => "研究同意書",
            Stage::Baseline => "前測問卷",
            Stage::Instruction => "任務說明",
            Stage::Task => "寫作任務",
            Stage::PostTaskA => "任務後問卷（一）",
            Stage::PostTaskB => "任務後問卷（二）",
            Stage::Authorship => "作者署名",
            Stage::Demographics => "基本資料",
            Stage::Debrief => "研究說明與致謝",
        }
    }
}

/// Outcome of an advance attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Moved(Stage),
    /// The gate failed; `first` is the scroll target.
    Incomplete {
        missing: Vec<String>,
        first: Option<String>,
    },
    AtEnd,
}

/// Minimum sentences before the story can be submitted.
pub const MIN_SENTENCES: usize = 5;

pub struct StepWizard {
    stage: Stage,
    show_missing: bool,
    pub consent_agreed: bool,
    pub comprehension_answer: Option<usize>,
}

impl StepWizard {
    pub fn new() -> Self {
        Self {
            stage: Stage::Consent,
            show_missing: false,
            consent_agreed: false,
            comprehension_answer: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Whether the UI should highlight unanswered items (set by a failed
    /// advance, cleared by any successful move).
    pub fn show_missing(&self) -> bool {
        self.show_missing
    }

    /// Try to move forward. The stage does not change unless its gate
    /// passes.
    pub fn advance(&mut self, doc: &SurveyDocument) -> Advance {
        let missing = self.missing_fields(doc);
        if !missing.is_empty() {
            self.show_missing = true;
            let first = missing.first().cloned();
            return Advance::Incomplete { missing, first };
        }

        match self.stage.next() {
            Some(next) => {
                self.stage = next;
                self.show_missing = false;
                Advance::Moved(next)
            }
            None => Advance::AtEnd,
        }
    }

    /// Move backward; never gated.
    pub fn retreat(&mut self) -> Option<Stage> {
        let prev = self.stage.prev()?;
        self.stage = prev;
        self.show_missing = false;
        Some(prev)
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Required answers still missing on the current stage, in
    /// presentation order.
    pub fn missing_fields(&self, doc: &SurveyDocument) -> Vec<String> {
        match self.stage {
            Stage::Consent => {
                if self.consent_agreed {
                    vec![]
                } else {
                    vec!["consent".to_string()]
                }
            }
            Stage::Baseline => unanswered(&content::baseline_ids(), doc),
            Stage::Instruction => {
                if self.comprehension_answer == Some(COMPREHENSION_CORRECT_INDEX) {
                    vec![]
                } else {
                    vec!["comprehension_check".to_string()]
                }
            }
            Stage::Task => {
                if text::count_sentences(&doc.writing.story_text) >= MIN_SENTENCES {
                    vec![]
                } else {
                    vec!["story_text".to_string()]
                }
            }
            Stage::PostTaskA => unanswered(&content::post_a_ids(), doc),
            Stage::PostTaskB => unanswered(&content::post_b_ids(), doc),
            Stage::Authorship => {
                match doc.authorship.value {
                    Some(v) if (1..=content::AUTHORSHIP_OPTIONS.len() as u8).contains(&v) => vec![],
                    _ => vec!["authorship_label".to_string()],
                }
            }
            Stage::Demographics => {
                let d = &doc.demographics;
                let mut missing = Vec::new();
                if d.age_group.trim().is_empty() {
                    missing.push("age_group".to_string());
                }
                if d.gender.trim().is_empty() {
                    missing.push("gender".to_string());
                }
                if d.education_level.trim().is_empty() {
                    missing.push("education_level".to_string());
                }
                if !d.email.contains('@') {
                    missing.push("email".to_string());
                }
                if d.follow_up_consent.is_none() {
                    missing.push("follow_up_consent".to_string());
                }
                missing
            }
            Stage::Debrief => vec![],
        }
    }
}

impl Default for StepWizard {
    fn default() -> Self {
        Self::new()
    }
}

fn unanswered(ids: &[&str], doc: &SurveyDocument) -> Vec<String> {
    ids.iter()
        .filter(|id| !doc.likert.contains_key(**id))
        .map(|id| id.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer_all(doc: &mut SurveyDocument, ids: &[&str]) {
        for id in ids {
            doc.likert.insert(id.to_string(), 4);
        }
    }

    #[test]
    fn test_stage_order() {
        assert_eq!(Stage::Consent.index(), 0);
        assert_eq!(Stage::Debrief.index(), 8);
        assert_eq!(Stage::Consent.next(), Some(Stage::Baseline));
        assert_eq!(Stage::Debrief.next(), None);
        assert_eq!(Stage::Consent.prev(), None);
    }

    #[test]
    fn test_consent_gate() {
        let mut wizard = StepWizard::new();
        let doc = SurveyDocument::default();

        assert!(matches!(wizard.advance(&doc), Advance::Incomplete { .. }));
        assert_eq!(wizard.stage(), Stage::Consent);
        assert!(wizard.show_missing());

        wizard.consent_agreed = true;
        assert_eq!(wizard.advance(&doc), Advance::Moved(Stage::Baseline));
        assert!(!wizard.show_missing());
    }

    #[test]
    fn test_missing_reported_in_order_with_first() {
        let mut wizard = StepWizard::new();
        wizard.consent_agreed = true;
        let mut doc = SurveyDocument::default();
        wizard.advance(&doc);
        assert_eq!(wizard.stage(), Stage::Baseline);

        // Answer only the first item; the rest must be reported in
        // presentation order with the first as scroll target.
        doc.likert.insert("wse1".to_string(), 5);
        match wizard.advance(&doc) {
            Advance::Incomplete { missing, first } => {
                let expected: Vec<String> = content::baseline_ids()
                    .into_iter()
                    .skip(1)
                    .map(String::from)
                    .collect();
                assert_eq!(missing, expected);
                assert_eq!(first.as_deref(), Some("wse2"));
            }
            other => panic!("expected Incomplete, got {:?}", other),
        }
        assert_eq!(wizard.stage(), Stage::Baseline);
    }

    #[test]
    fn test_instruction_requires_correct_answer() {
        let mut wizard = StepWizard::new();
        wizard.consent_agreed = true;
        let mut doc = SurveyDocument::default();
        answer_all(&mut doc, &content::baseline_ids());
        wizard.advance(&doc);
        wizard.advance(&doc);
        assert_eq!(wizard.stage(), Stage::Instruction);

        wizard.comprehension_answer = Some(0);
        assert!(matches!(wizard.advance(&doc), Advance::Incomplete { .. }));

        wizard.comprehension_answer = Some(COMPREHENSION_CORRECT_INDEX);
        assert_eq!(wizard.advance(&doc), Advance::Moved(Stage::Task));
    }

    #[test]
    fn test_task_requires_five_sentences() {
        let mut wizard = StepWizard::new();
        wizard.consent_agreed = true;
        wizard.comprehension_answer = Some(COMPREHENSION_CORRECT_INDEX);
        let mut doc = SurveyDocument::default();
        answer_all(&mut doc, &content::baseline_ids());
        for _ in 0..3 {
            wizard.advance(&doc);
        }
        assert_eq!(wizard.stage(), Stage::Task);

        doc.writing.story_text = "一句。兩句。三句。四句。".to_string();
        assert!(matches!(wizard.advance(&doc), Advance::Incomplete { .. }));

        doc.writing.story_text = "一句。兩句。三句。四句。五句。".to_string();
        assert_eq!(wizard.advance(&doc), Advance::Moved(Stage::PostTaskA));
    }

    #[test]
    fn test_email_gate() {
        let mut wizard = StepWizard::new();
        let mut doc = SurveyDocument::default();
        doc.demographics.age_group = "18-24".to_string();
        doc.demographics.gender = "female".to_string();
        doc.demographics.education_level = "bachelor".to_string();
        doc.demographics.follow_up_consent = Some(false);

        // Walk the wizard to the demographics stage directly.
        wizard.stage = Stage::Demographics;

        doc.demographics.email = "not-an-email".to_string();
        assert_eq!(wizard.missing_fields(&doc), vec!["email".to_string()]);

        doc.demographics.email = String::new();
        assert_eq!(wizard.missing_fields(&doc), vec!["email".to_string()]);

        doc.demographics.email = "a@b".to_string();
        assert!(wizard.missing_fields(&doc).is_empty());
    }

    #[test]
    fn test_follow_up_consent_must_be_explicit() {
        let mut wizard = StepWizard::new();
        wizard.stage = Stage::Demographics;
        let mut doc = SurveyDocument::default();
        doc.demographics.age_group = "25-34".to_string();
        doc.demographics.gender = "male".to_string();
        doc.demographics.education_level = "master".to_string();
        doc.demographics.email = "x@y.z".to_string();

        assert_eq!(
            wizard.missing_fields(&doc),
            vec!["follow_up_consent".to_string()]
        );
        doc.demographics.follow_up_consent = Some(true);
        assert!(wizard.missing_fields(&doc).is_empty());
    }

    #[test]
    fn test_retreat_always_allowed() {
        let mut wizard = StepWizard::new();
        wizard.stage = Stage::PostTaskB;
        assert_eq!(wizard.retreat(), Some(Stage::PostTaskA));
        assert_eq!(wizard.retreat(), Some(Stage::Task));
        wizard.stage = Stage::Consent;
        assert_eq!(wizard.retreat(), None);
    }

    #[test]
    fn test_authorship_gate() {
        let mut wizard = StepWizard::new();
        wizard.stage = Stage::Authorship;
        let mut doc = SurveyDocument::default();

        assert!(!wizard.missing_fields(&doc).is_empty());
        doc.authorship.value = Some(8);
        assert!(!wizard.missing_fields(&doc).is_empty());
        doc.authorship.value = Some(3);
        assert!(wizard.missing_fields(&doc).is_empty());
    }

    #[test]
    fn test_debrief_is_terminal() {
        let mut wizard = StepWizard::new();
        wizard.stage = Stage::Debrief;
        let doc = SurveyDocument::default();
        assert_eq!(wizard.advance(&doc), Advance::AtEnd);
    }
}
