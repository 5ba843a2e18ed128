//! Context-aware selection defaults.
//!
//! Each programme context carries its own selection criteria; callers get a
//! copy they can compose with per-call overrides.

use super::models::{MessageContext, MessagePriority, SelectionCriteria};
use chrono::Duration;
use std::collections::HashMap;

pub struct ContextSelector {
    current: MessageContext,
    criteria: HashMap<MessageContext, SelectionCriteria>,
}

impl Default for ContextSelector {
    fn default() -> Self {
        let mut criteria = HashMap::new();

        criteria.insert(
            MessageContext::LiveShow,
            SelectionCriteria {
                preferred_context: MessageContext::LiveShow,
                min_priority: MessagePriority::Normal,
                max_age: Duration::hours(1),
                ..SelectionCriteria::default()
            },
        );
        criteria.insert(
            MessageContext::News,
            SelectionCriteria {
                preferred_context: MessageContext::News,
                min_priority: MessagePriority::High,
                max_age: Duration::minutes(30),
                ..SelectionCriteria::default()
            },
        );
        criteria.insert(
            MessageContext::Emergency,
            SelectionCriteria {
                preferred_context: MessageContext::Emergency,
                min_priority: MessagePriority::Emergency,
                allow_repeats: true,
                max_repeat_count: 10,
                min_repeat_interval: Duration::seconds(30),
                ..SelectionCriteria::default()
            },
        );

        Self { current: MessageContext::Automated, criteria }
    }
}

impl ContextSelector {
    pub fn current(&self) -> MessageContext {
        self.current
    }

    pub fn set_current(&mut self, context: MessageContext) {
        self.current = context;
    }

    /// Criteria for a context; contexts without an explicit entry fall back
    /// to the defaults with the preferred context filled in.
    pub fn criteria_for(&self, context: MessageContext) -> SelectionCriteria {
        self.criteria.get(&context).cloned().unwrap_or_else(|| SelectionCriteria {
            preferred_context: context,
            ..SelectionCriteria::default()
        })
    }

    pub fn criteria_for_current(&self) -> SelectionCriteria {
        self.criteria_for(self.current)
    }

    pub fn set_criteria(&mut self, context: MessageContext, criteria: SelectionCriteria) {
        self.criteria.insert(context, criteria);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn news_context_narrows_priority_and_age() {
        let selector = ContextSelector::default();
        let criteria = selector.criteria_for(MessageContext::News);
        assert_eq!(criteria.min_priority, MessagePriority::High);
        assert_eq!(criteria.max_age, Duration::minutes(30));
    }

    #[test]
    fn emergency_context_allows_fast_repeats() {
        let selector = ContextSelector::default();
        let criteria = selector.criteria_for(MessageContext::Emergency);
        assert!(criteria.allow_repeats);
        assert_eq!(criteria.max_repeat_count, 10);
        assert_eq!(criteria.min_repeat_interval, Duration::seconds(30));
    }

    #[test]
    fn unknown_context_gets_defaults_with_context_set() {
        let selector = ContextSelector::default();
        let criteria = selector.criteria_for(MessageContext::Talk);
        assert_eq!(criteria.preferred_context, MessageContext::Talk);
        assert_eq!(criteria.min_priority, MessagePriority::Background);
    }

    #[test]
    fn current_context_is_mutable() {
        let mut selector = ContextSelector::default();
        assert_eq!(selector.current(), MessageContext::Automated);
        selector.set_current(MessageContext::News);
        assert_eq!(selector.criteria_for_current().min_priority, MessagePriority::High);
    }

    #[test]
    fn custom_criteria_override_defaults() {
        let mut selector = ContextSelector::default();
        selector.set_criteria(
            MessageContext::Music,
            SelectionCriteria { prefer_thai: true, ..SelectionCriteria::default() },
        );
        assert!(selector.criteria_for(MessageContext::Music).prefer_thai);
    }
}
