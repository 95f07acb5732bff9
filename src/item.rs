use std::{
    collections::{BTreeMap, BTreeSet, HashMap, VecDeque, btree_map::Entry},
    fmt::{Debug, Display},
};

use tracing::debug;

use crate::{Grammar, Production, Terminal, Token, error::Error, lookahead::Lookahead};

// 项集需要作为 HashMap 的键, 要求相等的项集 hash 结果相同,
// 所以项集和前瞻符都用 BTreeSet 保存, 始终保持有序.

/// LR 项, 前瞻符为空时就是 LR(0) 项.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Item<'a> {
    /// 项对应的产生式.
    prod: &'a Production<'a>,
    /// dot 所处的位置, 在 `0..=prod.len()` 范围中, 产生式中的 epsilon 不算长度.
    dot: usize,
    /// 前瞻字符
    look_aheads: BTreeSet<Terminal<'a>>,
}

impl Item<'_> {
    fn fmt_core(&self, tok: impl Fn(&Token) -> String) -> String {
        let tail_s: String = self
            .prod
            .tail_without_eps()
            .enumerate()
            .map(|(i, t)| format!("{}{} ", if i == self.dot { "⋅ " } else { "" }, tok(t)))
            .collect();
        format!(
            "{}{}",
            tail_s.trim_end(),
            if self.dot == self.prod.len() {
                " ⋅"
            } else {
                ""
            }
        )
        .trim()
        .to_string()
    }
}

impl Debug for Item<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&format!(
            "Item({:?} -> {} {:?})",
            self.prod.head(),
            self.fmt_core(|t| format!("{t:?}")),
            &self.look_aheads
        ))
    }
}

impl Display for Item<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = format!("{} -> {}", self.prod.head(), self.fmt_core(|t| t.to_string()));
        if self.look_aheads.is_empty() {
            return f.pad(&core);
        }
        let look_aheads: String = self.look_aheads.iter().map(|x| format!("{x}, ")).collect();
        f.pad(&format!(
            "{core} 〈{}〉",
            look_aheads.trim_end_matches([',', ' '])
        ))
    }
}

impl<'a> Item<'a> {
    #[must_use]
    pub(crate) fn new(
        prod: &'a Production<'a>,
        dot: usize,
        look_aheads: BTreeSet<Terminal<'a>>,
    ) -> Self {
        debug_assert!(dot <= prod.len(), "dot {dot} out of range in {prod}");
        Self {
            prod,
            dot,
            look_aheads,
        }
    }

    #[must_use]
    pub(crate) fn initial(prod: &'a Production<'a>, look_aheads: BTreeSet<Terminal<'a>>) -> Self {
        Self::new(prod, 0, look_aheads)
    }

    #[must_use]
    fn with_dot(&self, dot: usize) -> Self {
        Self {
            prod: self.prod,
            dot,
            look_aheads: self.look_aheads.clone(),
        }
    }

    /// dot 之后, 期望符号之后的剩余序列.
    pub(crate) fn future_seq(&self) -> impl Iterator<Item = &Token<'a>> {
        self.prod.tail_without_eps().skip(self.dot + 1)
    }

    /// dot 之后紧跟的符号, 完成项返回 [`None`].
    #[must_use]
    pub fn expected(&self) -> Option<Token<'a>> {
        self.prod.tail_without_eps().nth(self.dot).copied()
    }

    /// 越过 `token` 得到的新项, 如果期望的不是 `token` 那么返回 [`None`].
    #[must_use]
    pub fn goto(&self, token: Token<'a>) -> Option<Self> {
        let Some(expected) = self.expected() else {
            None?
        };
        if expected != token {
            None?
        }
        Some(self.with_dot(self.dot + 1))
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.dot == self.prod.len()
    }

    #[must_use]
    fn core(&self) -> (&'a Production<'a>, usize) {
        (self.prod, self.dot)
    }

    #[must_use]
    pub fn prod(&self) -> &'a Production<'a> {
        self.prod
    }

    #[must_use]
    pub fn dot(&self) -> usize {
        self.dot
    }

    #[must_use]
    pub fn look_aheads(&self) -> &BTreeSet<Terminal<'a>> {
        &self.look_aheads
    }
}

/// 项集, 始终是闭包之后的形式, 核心相同的项已经合并了前瞻符.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemSet<'a> {
    items: BTreeSet<Item<'a>>,
}

impl<'a> ItemSet<'a> {
    /// 获取 I_0 项集.
    ///
    /// 如果 grammar 没有增广, 那么返回 [`Error::GrammarNotAugmented`]
    pub fn initial(grammar: &Grammar<'a>, strategy: &impl Lookahead<'a>) -> Result<Self, Error> {
        if !grammar.is_augmented() {
            Err(Error::GrammarNotAugmented)?
        }
        let start_prod = grammar
            .prods_of(grammar.symbol_start())
            .next()
            .ok_or(Error::GrammarNotAugmented)?;
        let item = Item::initial(start_prod, strategy.initial());
        Ok(Self {
            items: [item].into(),
        }
        .closure(grammar, strategy))
    }

    /// 获取当前项集的闭包项集.
    ///
    /// 核心 (产生式, dot) 相同的项合并为一个项, 前瞻符取并集,
    /// 直到没有新的核心, 也没有新的前瞻符加入为止.
    #[must_use]
    pub fn closure(self, grammar: &Grammar<'a>, strategy: &impl Lookahead<'a>) -> Self {
        let mut cores: BTreeMap<(&'a Production<'a>, usize), BTreeSet<Terminal<'a>>> =
            BTreeMap::new();
        for item in self.items {
            cores
                .entry(item.core())
                .or_default()
                .extend(item.look_aheads);
        }
        loop {
            let mut changed = false;
            let snapshot: Vec<Item<'a>> = cores
                .iter()
                .map(|(&(prod, dot), la)| Item::new(prod, dot, la.clone()))
                .collect();
            for item in &snapshot {
                let Some(Token::NonTerminal(nt)) = item.expected() else {
                    continue;
                };
                let look_aheads = strategy.spawn(grammar, item);
                for prod in grammar.prods_of(nt) {
                    match cores.entry((prod, 0)) {
                        Entry::Vacant(e) => {
                            e.insert(look_aheads.clone());
                            changed = true;
                        }
                        Entry::Occupied(mut e) => {
                            let before = e.get().len();
                            e.get_mut().extend(look_aheads.iter().copied());
                            changed |= e.get().len() != before;
                        }
                    }
                }
            }
            if !changed {
                break;
            }
        }
        Self {
            items: cores
                .into_iter()
                .map(|((prod, dot), la)| Item::new(prod, dot, la))
                .collect(),
        }
    }

    /// GOTO(self, token), 如果没有项期望 `token`, 那么返回 [`None`], 此时不存在转换边.
    #[must_use]
    pub fn goto(
        &self,
        token: Token<'a>,
        grammar: &Grammar<'a>,
        strategy: &impl Lookahead<'a>,
    ) -> Option<Self> {
        let items: BTreeSet<Item<'a>> = self.items.iter().filter_map(|i| i.goto(token)).collect();
        if items.is_empty() {
            None
        } else {
            Some(Self { items }.closure(grammar, strategy))
        }
    }

    pub fn items(&self) -> impl Iterator<Item = &Item<'a>> {
        self.items.iter()
    }

    /// 遍历完成项以及其归约所用的终结符.
    pub fn reduces<'s, L: Lookahead<'a>>(
        &'s self,
        strategy: &'s L,
    ) -> impl Iterator<Item = (&'s Item<'a>, Terminal<'a>)> {
        self.items
            .iter()
            .filter(|i| i.is_complete())
            .flat_map(move |i| strategy.lookahead_for(i).into_iter().map(move |t| (i, t)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// 规范项集族.
#[derive(Debug)]
pub struct Family<'a> {
    item_sets: Vec<&'a ItemSet<'a>>,
    item_sets_idx: HashMap<&'a ItemSet<'a>, usize>,
    /// 描述了 goto 动作, 下标为起始项集.
    /// GOTO(I_i, tok) = gotos[i][tok]
    gotos: Vec<BTreeMap<Token<'a>, usize>>,
}

impl<'a> Family<'a> {
    /// 从增广文法 `grammar` 构建项集族, 项集分配在文法的 [`bumpalo::Bump`] 中.
    ///
    /// 按队列顺序处理每个项集恰好一次, 新项集按第一次被发现的顺序编号,
    /// 所以同一个文法每次得到的编号都相同.
    pub fn from_grammar(
        grammar: &'a Grammar<'a>,
        strategy: &impl Lookahead<'a>,
    ) -> Result<Self, Error> {
        let bump = grammar.bump();
        let i0 = &*bump.alloc(ItemSet::initial(grammar, strategy)?);
        #[allow(clippy::mutable_key_type)]
        let mut item_sets_idx = HashMap::new();
        item_sets_idx.insert(i0, 0);
        let mut item_sets = vec![i0];
        let mut gotos = vec![BTreeMap::new()];
        let mut queue = VecDeque::from([0]);
        while let Some(from) = queue.pop_front() {
            let is = item_sets[from];
            for &tok in grammar.tokens() {
                let Some(nis) = is.goto(tok, grammar, strategy) else {
                    continue;
                };
                let to = match item_sets_idx.get(&nis) {
                    Some(&to) => to,
                    None => {
                        let to = item_sets.len();
                        let nis = &*bump.alloc(nis);
                        debug!("new item set I_{to} = GOTO(I_{from}, {tok}): {nis:?}");
                        item_sets.push(nis);
                        item_sets_idx.insert(nis, to);
                        gotos.push(BTreeMap::new());
                        queue.push_back(to);
                        to
                    }
                };
                gotos[from].insert(tok, to);
            }
        }
        debug!("family built with {} item sets", item_sets.len());
        Ok(Self {
            item_sets,
            item_sets_idx,
            gotos,
        })
    }

    /// 按照 I_i (i = 0, 1, 2, 3...) 顺序获取项集.
    #[must_use]
    pub fn item_sets(&self) -> &[&'a ItemSet<'a>] {
        &self.item_sets
    }

    /// 查找项集的编号.
    #[must_use]
    pub fn index_of(&self, item_set: &ItemSet<'a>) -> Option<usize> {
        self.item_sets_idx.get(item_set).copied()
    }

    /// 遍历 gotos (起始项集, 转换 Token, 到达项集).
    pub fn gotos(&self) -> impl Iterator<Item = (usize, Token<'a>, usize)> {
        self.gotos
            .iter()
            .enumerate()
            .flat_map(|(from, v)| v.iter().map(move |(&tok, &to)| (from, tok, to)))
    }

    /// 获取一个项集的 gotos: (转换 Token, 到达项集).
    /// 如果没有对应项集, 那么返回 [`None`]
    #[must_use]
    pub fn gotos_of(&self, item_set: usize) -> Option<impl Iterator<Item = (Token<'a>, usize)>> {
        self.gotos
            .get(item_set)
            .map(|v| v.iter().map(|(&tok, &to)| (tok, to)))
    }

    /// GOTO(I_from, tok)
    #[must_use]
    pub fn goto(&self, from: usize, tok: Token<'a>) -> Option<usize> {
        self.gotos.get(from)?.get(&tok).copied()
    }

    /// 获取项集族数量
    #[must_use]
    pub fn len(&self) -> usize {
        self.item_sets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
