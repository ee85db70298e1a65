use std::collections::HashMap;

use super::Keyword;

/// Two-way map between keyword spellings and their kinds.
#[derive(Debug, Clone, Default)]
pub struct LexMap {
    by_spelling: HashMap<&'static str, Keyword>,
    by_kind: HashMap<Keyword, &'static str>,
}

impl LexMap {
    pub fn insert(&mut self, spelling: &'static str, keyword: Keyword) {
        self.by_spelling.insert(spelling, keyword);
        self.by_kind.insert(keyword, spelling);
    }

    pub fn get(&self, spelling: &str) -> Option<Keyword> {
        self.by_spelling.get(spelling).copied()
    }

    pub fn is_keyword(&self, spelling: &str) -> bool {
        self.by_spelling.contains_key(spelling)
    }

    pub fn spelling(&self, keyword: Keyword) -> Option<&'static str> {
        self.by_kind.get(&keyword).copied()
    }
}
