//! 前瞻符策略.
//!
//! SLR(1) 和规范 LR(1) 共用同一套 closure / goto / 项集族构建逻辑,
//! 区别只在于项携带的前瞻符, 以及完成项在哪些终结符下归约.

use std::collections::BTreeSet;

use crate::{Grammar, Item, Terminal, follow::FollowSets, token::{EOF, EPSILON}};

pub trait Lookahead<'a> {
    /// 增广产生式初始项 `S' -> ⋅ S` 的前瞻符.
    fn initial(&self) -> BTreeSet<Terminal<'a>>;

    /// closure 时, 由 `item` (点后面是非终结符) 展开出的新项携带的前瞻符.
    fn spawn(&self, grammar: &Grammar<'a>, item: &Item<'a>) -> BTreeSet<Terminal<'a>>;

    /// 完成项 `item` 在哪些终结符下执行归约.
    fn lookahead_for(&self, item: &Item<'a>) -> BTreeSet<Terminal<'a>>;
}

/// SLR(1): 项不带前瞻符 (即 LR(0) 项), 归约时查 follow 集.
#[derive(Debug, Clone)]
pub struct Slr<'a> {
    follow: FollowSets<'a>,
}

impl<'a> Slr<'a> {
    #[must_use]
    pub fn new(grammar: &Grammar<'a>) -> Self {
        Self {
            follow: FollowSets::of(grammar),
        }
    }

    #[must_use]
    pub fn follow(&self) -> &FollowSets<'a> {
        &self.follow
    }
}

impl<'a> Lookahead<'a> for Slr<'a> {
    fn initial(&self) -> BTreeSet<Terminal<'a>> {
        BTreeSet::new()
    }

    fn spawn(&self, _grammar: &Grammar<'a>, _item: &Item<'a>) -> BTreeSet<Terminal<'a>> {
        BTreeSet::new()
    }

    fn lookahead_for(&self, item: &Item<'a>) -> BTreeSet<Terminal<'a>> {
        self.follow
            .get(item.prod().head())
            .cloned()
            .unwrap_or_default()
    }
}

/// 规范 LR(1): 项 `[A -> α ⋅ B β, a]` 展开出的 `B` 产生式的前瞻符为 FIRST(βa).
#[derive(Debug, Clone, Copy, Default)]
pub struct Lr1;

impl<'a> Lookahead<'a> for Lr1 {
    fn initial(&self) -> BTreeSet<Terminal<'a>> {
        [EOF].into()
    }

    fn spawn(&self, grammar: &Grammar<'a>, item: &Item<'a>) -> BTreeSet<Terminal<'a>> {
        let mut look_aheads = grammar.first_set(item.future_seq().copied());
        if look_aheads.remove(&EPSILON) {
            look_aheads.extend(item.look_aheads().iter().copied());
        }
        look_aheads
    }

    fn lookahead_for(&self, item: &Item<'a>) -> BTreeSet<Terminal<'a>> {
        item.look_aheads().clone()
    }
}
