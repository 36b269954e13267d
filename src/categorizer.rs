use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Category;

/// Lowercase substring triggers per category. Categories are scanned in
/// declaration order, triggers in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryRuleSet {
    rules: BTreeMap<Category, Vec<String>>,
}

impl CategoryRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// First-match classification. Returns the amount unchanged alongside
    /// the category.
    pub fn classify(&self, description: &str, amount: Decimal) -> (Category, Decimal) {
        let description = description.to_lowercase();
        for (category, triggers) in &self.rules {
            if triggers.iter().any(|t| description.contains(t.as_str())) {
                return (*category, amount);
            }
        }
        (Category::Unknown, amount)
    }

    pub fn triggers(&self, category: Category) -> &[String] {
        self.rules.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Append a trigger. Returns false when it is empty, already present
    /// under this category, or the category cannot carry rules.
    pub fn add_trigger(&mut self, category: Category, trigger: &str) -> bool {
        let trigger = trigger.trim().to_lowercase();
        if trigger.is_empty() || category == Category::Unknown {
            return false;
        }
        let list = self.rules.entry(category).or_default();
        if list.contains(&trigger) {
            return false;
        }
        list.push(trigger);
        true
    }

    /// Remove and return the most recently added trigger of `category`.
    pub fn pop_trigger(&mut self, category: Category) -> Option<String> {
        let list = self.rules.get_mut(&category)?;
        let popped = list.pop();
        if list.is_empty() {
            self.rules.remove(&category);
        }
        popped
    }

    pub fn remove_trigger(&mut self, category: Category, trigger: &str) -> bool {
        let trigger = trigger.trim().to_lowercase();
        let Some(list) = self.rules.get_mut(&category) else {
            return false;
        };
        let before = list.len();
        list.retain(|t| *t != trigger);
        let removed = list.len() != before;
        if list.is_empty() {
            self.rules.remove(&category);
        }
        removed
    }

    /// Iterate `(category, trigger)` pairs in scan order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &str)> {
        self.rules
            .iter()
            .flat_map(|(c, ts)| ts.iter().map(move |t| (*c, t.as_str())))
    }

    /// Total number of triggers.
    pub fn len(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn rules(pairs: &[(Category, &str)]) -> CategoryRuleSet {
        let mut set = CategoryRuleSet::new();
        for (c, t) in pairs {
            set.add_trigger(*c, t);
        }
        set
    }

    #[test]
    fn test_classify_substring_match() {
        let set = rules(&[(Category::Food, "coffee")]);
        assert_eq!(set.classify("Big Coffee Shop", d("4.50")), (Category::Food, d("4.50")));
        assert_eq!(
            set.classify("Unrelated Store", d("10.00")),
            (Category::Unknown, d("10.00"))
        );
    }

    #[test]
    fn test_classify_scans_categories_in_declaration_order() {
        // Inserted Misc first, but Car is declared earlier.
        let set = rules(&[(Category::Misc, "sunoco"), (Category::Car, "sunoco gas")]);
        assert_eq!(set.classify("SUNOCO GAS 12", d("30")).0, Category::Car);
        assert_eq!(set.classify("SUNOCO MART", d("3")).0, Category::Misc);
    }

    #[test]
    fn test_classify_paycheck_triggers() {
        let set = rules(&[(Category::Paycheck, "acme payroll")]);
        assert_eq!(set.classify("ACME PAYROLL DIR DEP", d("-2000")).0, Category::Paycheck);
    }

    #[test]
    fn test_add_trigger_lowercases_and_rejects_duplicates() {
        let mut set = CategoryRuleSet::new();
        assert!(set.add_trigger(Category::Car, " SUNOCO "));
        assert!(!set.add_trigger(Category::Car, "sunoco"));
        assert!(!set.add_trigger(Category::Car, "   "));
        assert!(!set.add_trigger(Category::Unknown, "x"));
        assert_eq!(set.triggers(Category::Car), ["sunoco".to_string()]);
    }

    #[test]
    fn test_pop_trigger_removes_latest() {
        let mut set = rules(&[(Category::Food, "coffee"), (Category::Food, "bagel")]);
        assert_eq!(set.pop_trigger(Category::Food).as_deref(), Some("bagel"));
        assert_eq!(set.triggers(Category::Food), ["coffee".to_string()]);
        assert_eq!(set.pop_trigger(Category::Food).as_deref(), Some("coffee"));
        assert_eq!(set.pop_trigger(Category::Food), None);
        assert!(set.is_empty());
    }

    #[test]
    fn test_remove_trigger() {
        let mut set = rules(&[(Category::Media, "netflix"), (Category::Media, "hulu")]);
        assert!(set.remove_trigger(Category::Media, "NETFLIX"));
        assert!(!set.remove_trigger(Category::Media, "netflix"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_serde_uses_category_names_as_keys() {
        let set = rules(&[(Category::Food, "coffee"), (Category::Credit, "discover des")]);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"{"Food":["coffee"],"Credit":["discover des"]}"#);
        let back: CategoryRuleSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_deserialize_legacy_credit_card_key() {
        let set: CategoryRuleSet =
            serde_json::from_str(r#"{"Credit Card": ["discover e-payment"]}"#).unwrap();
        assert_eq!(set.triggers(Category::Credit), ["discover e-payment".to_string()]);
    }
}
