use std::collections::HashMap;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::categorizer::CategoryRuleSet;
use crate::models::{Category, Transaction};

const EXIT_WORDS: &[&str] = &["exit", "quit", "0"];
const UNDO_WORDS: &[&str] = &["undo", "back", "rollback"];

/// Why a line of input was not applied. Rejections never change state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SortError {
    #[error("Invalid input. Please follow the format of EXPENSE:CATEGORY")]
    InvalidFormat,

    #[error("Invalid input. The expense before ':' can't be empty")]
    EmptyExpense,

    #[error("Invalid category '{0}'. Please only select from: {}", sortable_list())]
    UnknownCategory(String),

    #[error("No uncategorized expenses contain '{0}'")]
    NoMatches(String),

    #[error("There's nothing to undo")]
    NothingToUndo,

    #[error("Only one undo operation is available")]
    UndoAlreadyUsed,
}

pub fn sortable_list() -> String {
    Category::SORTABLE
        .iter()
        .map(|c| c.name())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Categorized {
        trigger: String,
        category: Category,
        rows: usize,
    },
    Undone {
        trigger: String,
        category: Category,
    },
    Rejected(SortError),
    Exit,
}

/// One line of the uncategorized view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingExpense {
    pub description: String,
    pub count: usize,
    pub total: Decimal,
}

/// Working table plus the single pre-edit snapshot it can roll back to.
struct History {
    current: Vec<Transaction>,
    previous: Option<Vec<Transaction>>,
    /// Last edit: category, trigger, and whether the trigger was new.
    last_edit: Option<(Category, String, bool)>,
    undo_consumed: bool,
}

/// Interactive rule-editing session over a copy of the store.
pub struct SortSession {
    rules: CategoryRuleSet,
    history: History,
    edits: usize,
}

impl SortSession {
    pub fn new(rules: CategoryRuleSet, rows: Vec<Transaction>) -> Self {
        Self {
            rules,
            history: History {
                current: rows,
                previous: None,
                last_edit: None,
                undo_consumed: false,
            },
            edits: 0,
        }
    }

    pub fn rules(&self) -> &CategoryRuleSet {
        &self.rules
    }

    /// Successful edits still in effect.
    pub fn edits(&self) -> usize {
        self.edits
    }

    /// Distinct uncategorized descriptions with their counts, most frequent
    /// first. Recomputed from the full working table on every call.
    pub fn uncategorized_view(&self, top_n: usize) -> Vec<PendingExpense> {
        let mut order: Vec<&str> = Vec::new();
        let mut counts: HashMap<&str, (usize, Decimal)> = HashMap::new();
        for txn in self.history.current.iter().filter(|t| !t.category.is_assigned()) {
            let entry = counts.entry(txn.description.as_str()).or_insert_with(|| {
                order.push(txn.description.as_str());
                (0, Decimal::ZERO)
            });
            entry.0 += 1;
            entry.1 += txn.amount;
        }
        let mut view: Vec<PendingExpense> = order
            .into_iter()
            .map(|d| PendingExpense {
                description: d.to_string(),
                count: counts[d].0,
                total: counts[d].1,
            })
            .collect();
        view.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.description.cmp(&b.description)));
        view.truncate(top_n);
        view
    }

    /// Number of distinct uncategorized descriptions.
    pub fn pending_count(&self) -> usize {
        self.uncategorized_view(usize::MAX).len()
    }

    pub fn handle(&mut self, input: &str) -> Response {
        let cmd = input.trim().to_lowercase();
        if EXIT_WORDS.contains(&cmd.as_str()) {
            return Response::Exit;
        }
        if UNDO_WORDS.contains(&cmd.as_str()) {
            return match self.undo() {
                Ok(r) => r,
                Err(e) => Response::Rejected(e),
            };
        }
        match self.edit(input) {
            Ok(r) => r,
            Err(e) => Response::Rejected(e),
        }
    }

    fn edit(&mut self, input: &str) -> Result<Response, SortError> {
        let parts: Vec<&str> = input.split(':').collect();
        let [expense, category] = parts.as_slice() else {
            return Err(SortError::InvalidFormat);
        };
        let trigger = expense.trim().to_lowercase();
        if trigger.is_empty() {
            return Err(SortError::EmptyExpense);
        }
        let category = Category::parse_sortable(category)
            .ok_or_else(|| SortError::UnknownCategory(category.trim().to_string()))?;

        let mut next = self.history.current.clone();
        let mut rows = 0usize;
        for txn in next.iter_mut().filter(|t| !t.category.is_assigned()) {
            if txn.description.to_lowercase().contains(&trigger) {
                txn.category = category;
                rows += 1;
            }
        }
        if rows == 0 {
            return Err(SortError::NoMatches(trigger));
        }

        let appended = self.rules.add_trigger(category, &trigger);
        self.history.previous = Some(std::mem::replace(&mut self.history.current, next));
        self.history.last_edit = Some((category, trigger.clone(), appended));
        self.history.undo_consumed = false;
        self.edits += 1;
        Ok(Response::Categorized {
            trigger,
            category,
            rows,
        })
    }

    fn undo(&mut self) -> Result<Response, SortError> {
        if self.history.undo_consumed {
            return Err(SortError::UndoAlreadyUsed);
        }
        let (Some(previous), Some((category, trigger, appended))) =
            (self.history.previous.take(), self.history.last_edit.take())
        else {
            return Err(SortError::NothingToUndo);
        };
        self.history.current = previous;
        self.history.undo_consumed = true;
        self.edits -= 1;
        if appended {
            self.rules.pop_trigger(category);
        }
        Ok(Response::Undone { trigger, category })
    }

    /// End the session, handing back the edited rule set.
    pub fn finish(self) -> CategoryRuleSet {
        self.rules
    }
}
