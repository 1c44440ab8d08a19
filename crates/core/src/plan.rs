use serde::Deserialize;

/// Question material attached to a job's prompt template. All fields are
/// optional in the payload; missing lists behave as empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PromptTemplate {
    pub greeting_message: Option<String>,
    pub technical_questions: Vec<String>,
    pub default_questions: Vec<String>,
}

/// Ordered, bounded list of questions for one session. Built once at the
/// start of the interview and consumed by index.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionPlan {
    questions: Vec<String>,
}

impl QuestionPlan {
    /// Concatenates the template's technical questions then its default
    /// questions, preserving each list's order. When both are empty, falls
    /// back to a fixed generic sequence personalized with the candidate
    /// name, job title, and department. The result is truncated to `count`
    /// entries (floor of 1); fewer than `count` available is not an error.
    pub fn build(
        template: &PromptTemplate,
        candidate_name: &str,
        job_title: &str,
        job_department: &str,
        count: usize,
    ) -> Self {
        let mut questions: Vec<String> = template
            .technical_questions
            .iter()
            .chain(template.default_questions.iter())
            .cloned()
            .collect();

        if questions.is_empty() {
            questions = vec![
                format!("Hello {candidate_name}, tell me about yourself and your background"),
                format!("Why are you interested in the {job_title} position?"),
                format!("What relevant experience do you have for this {job_department} role?"),
                "Describe a challenging project you worked on".to_string(),
                "What are your greatest strengths?".to_string(),
                "Do you have any questions for us?".to_string(),
            ];
        }

        questions.truncate(count.max(1));
        Self { questions }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.questions.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.questions.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(technical: &[&str], default: &[&str]) -> PromptTemplate {
        PromptTemplate {
            greeting_message: None,
            technical_questions: technical.iter().map(|s| s.to_string()).collect(),
            default_questions: default.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn technical_questions_come_first_and_count_truncates() {
        let plan = QuestionPlan::build(&template(&["A", "B"], &["C"]), "Ada", "Engineer", "R&D", 2);
        assert_eq!(plan.iter().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn default_questions_follow_technical_ones() {
        let plan = QuestionPlan::build(&template(&["A"], &["C", "D"]), "Ada", "Engineer", "R&D", 6);
        assert_eq!(plan.iter().collect::<Vec<_>>(), vec!["A", "C", "D"]);
    }

    #[test]
    fn empty_template_uses_personalized_fallback() {
        let plan = QuestionPlan::build(&template(&[], &[]), "Ada", "Staff Engineer", "Platform", 6);
        assert_eq!(plan.len(), 6);
        assert_eq!(
            plan.get(0),
            Some("Hello Ada, tell me about yourself and your background")
        );
        assert_eq!(
            plan.get(1),
            Some("Why are you interested in the Staff Engineer position?")
        );
        assert_eq!(
            plan.get(2),
            Some("What relevant experience do you have for this Platform role?")
        );
    }

    #[test]
    fn count_has_a_floor_of_one() {
        let plan = QuestionPlan::build(&template(&["A", "B"], &[]), "Ada", "Engineer", "R&D", 0);
        assert_eq!(plan.iter().collect::<Vec<_>>(), vec!["A"]);
    }
}
