use crate::config::StoryPointRule;
use std::collections::BTreeSet;

/// Ordered label → story points table for one instance
#[derive(Debug, Clone, Default)]
pub struct StoryPointMapper {
    rules: Vec<StoryPointRule>,
}

impl StoryPointMapper {
    pub fn new(rules: Vec<StoryPointRule>) -> Self {
        Self { rules }
    }

    pub fn with_rule(mut self, label: impl Into<String>, points: u32) -> Self {
        self.rules.push(StoryPointRule {
            label: label.into(),
            points,
        });
        self
    }

    /// Points for the first table row whose label the ticket carries
    pub fn points_for(&self, labels: &BTreeSet<String>) -> Option<u32> {
        self.rules
            .iter()
            .find(|rule| labels.contains(&rule.label))
            .map(|rule| rule.points)
            .filter(|points| *points > 0)
    }
}
