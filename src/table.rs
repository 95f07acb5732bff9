use std::{collections::HashMap, fmt::Display, mem::swap};

use tracing::{debug, warn};

use crate::{
    Family, Grammar, NonTerminal, Terminal, Token,
    error::Error,
    lookahead::{Lookahead, Lr1, Slr},
    token::EOF,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActionCell {
    /// 移入项集状态编号.
    Shift(usize),
    /// 规约产生式编号.
    Reduce(usize),
    /// 包含冲突的两个或者多个表项(树状嵌套).
    Conflict(Box<ActionCell>, Box<ActionCell>),
    /// 接受
    Accept,
    #[default]
    Empty,
}

impl Display for ActionCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&match self {
            Self::Shift(s) => format!("s{s}"),
            Self::Reduce(r) => format!("r{r}"),
            Self::Conflict(_, _) => format!(
                "[{}]",
                self.flatten()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join("/")
            ),
            Self::Accept => "acc".to_string(),
            Self::Empty => "".to_string(),
        })
    }
}

impl ActionCell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_, _))
    }

    /// 放入新的 cell 内容, 返回是否冲突.
    ///
    /// 已有内容时不会覆盖, 而是和新内容组成 [`ActionCell::Conflict`].
    /// 写入完全相同的内容不算冲突.
    fn update(&mut self, cell: ActionCell) -> bool {
        let mut this = ActionCell::Empty;
        swap(&mut this, self);
        match (this, cell) {
            (Self::Empty, other) => {
                *self = other;
                false
            }
            (this, Self::Empty) => {
                *self = this;
                false
            }
            (this, other) if this == other || this.flatten().any(|c| *c == other) => {
                *self = this;
                false
            }
            (a, b) => {
                *self = Self::Conflict(Box::new(a), Box::new(b));
                true
            }
        }
    }

    /// 展开所有的叶子节点(非 [`ActionCell::Conflict`] 节点)(从树的左侧到右侧).
    #[must_use]
    pub fn flatten(&self) -> Box<dyn Iterator<Item = &ActionCell> + '_> {
        match self {
            Self::Conflict(left, right) => Box::new(left.flatten().chain(right.flatten())),
            _ => Box::new(std::iter::once(self)),
        }
    }
}

/// ACTION 表和 GOTO 表.
///
/// 构建完成之后只能读取, 可以被任意多个 [`crate::Parser`] 共享.
#[derive(Debug)]
pub struct Table<'a> {
    /// ACTION 表
    action: Vec<Vec<ActionCell>>,
    /// GOTO 表, 每个格子表示 GOTO 到的项集状态编号.
    goto: Vec<Vec<Option<usize>>>,
    /// [`Family::item_sets`] 中的顺序就是 GOTO 和 ACTION 表的状态顺序.
    family: Family<'a>,
    grammar: &'a Grammar<'a>,
    /// ACTION 表中的终结符, 下标即为 ACTION 表中的列.
    terms: Vec<Terminal<'a>>,
    /// GOTO 表中的非终结符, 下标即为 GOTO 表中的列.
    non_terms: Vec<NonTerminal<'a>>,
    term_idxes: HashMap<Terminal<'a>, usize>,
    non_term_idxes: HashMap<NonTerminal<'a>, usize>,
    /// 出现冲突的 (项集状态, 终结符).
    conflicts: Vec<(usize, Terminal<'a>)>,
}

impl<'a> Table<'a> {
    /// 使用 SLR(1) 方法构建分析表.
    pub fn slr(grammar: &'a Grammar<'a>) -> Result<Self, Error> {
        Self::build(grammar, &Slr::new(grammar))
    }

    /// 使用规范 LR(1) 方法构建分析表.
    pub fn lr1(grammar: &'a Grammar<'a>) -> Result<Self, Error> {
        Self::build(grammar, &Lr1)
    }

    /// 构建项集族, 然后填写 ACTION 和 GOTO 表.
    ///
    /// - 终结符上的转换为移入, 非终结符上的转换为 GOTO.
    /// - 完成项在 `strategy` 给出的终结符下归约;
    ///   增广产生式的完成项在 [`EOF`] 下接受.
    ///
    /// 冲突的表项不会被覆盖, 见 [`Table::conflicts`].
    pub fn build(grammar: &'a Grammar<'a>, strategy: &impl Lookahead<'a>) -> Result<Self, Error> {
        let family = Family::from_grammar(grammar, strategy)?;
        let terms: Vec<_> = grammar.terminals().collect();
        let non_terms: Vec<_> = grammar.non_terminals().collect();
        let term_idxes: HashMap<Terminal<'a>, usize> =
            terms.iter().enumerate().map(|(a, b)| (*b, a)).collect();
        let non_term_idxes: HashMap<NonTerminal<'a>, usize> =
            non_terms.iter().enumerate().map(|(a, b)| (*b, a)).collect();
        let rows = family.len();
        let mut action = vec![vec![ActionCell::Empty; terms.len()]; rows];
        let mut goto = vec![vec![None; non_terms.len()]; rows];
        let mut conflicts = Vec::new();
        for (row, is) in family.item_sets().iter().enumerate() {
            for (tok, to) in family.gotos_of(row).into_iter().flatten() {
                match tok {
                    Token::Terminal(t) => {
                        let Some(&col) = term_idxes.get(&t) else {
                            continue;
                        };
                        if action[row][col].update(ActionCell::Shift(to)) {
                            conflicts.push((row, t));
                        }
                    }
                    Token::NonTerminal(nt) => {
                        if let Some(&col) = non_term_idxes.get(&nt) {
                            goto[row][col] = Some(to);
                        }
                    }
                }
            }
            for (item, t) in is.reduces(strategy) {
                let Some(&col) = term_idxes.get(&t) else {
                    continue;
                };
                let cell = if item.prod().head() == grammar.symbol_start() && t == EOF {
                    // start' -> start dot, EOF 也就是 acc 状态.
                    ActionCell::Accept
                } else {
                    // 产生式一定在文法中, 因为项都是从文法的产生式构造的.
                    let Some(prod_idx) = grammar.index_of_prod(item.prod()) else {
                        continue;
                    };
                    ActionCell::Reduce(prod_idx)
                };
                if action[row][col].update(cell) {
                    conflicts.push((row, t));
                }
            }
        }
        conflicts.sort();
        conflicts.dedup();
        for (row, t) in &conflicts {
            warn!("conflict on I_{row}, term: {t}: {}", action[*row][term_idxes[t]]);
        }
        debug!(
            "table built: {rows} states, {} terminals, {} non-terminals",
            terms.len(),
            non_terms.len()
        );
        Ok(Self {
            action,
            goto,
            family,
            grammar,
            terms,
            non_terms,
            term_idxes,
            non_term_idxes,
            conflicts,
        })
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.family.len()
    }

    #[must_use]
    pub fn action_cols(&self) -> usize {
        self.terms.len()
    }

    #[must_use]
    pub fn goto_cols(&self) -> usize {
        self.non_terms.len()
    }

    /// 文法在当前分析方法下是否是冲突的.
    #[must_use]
    pub fn conflict(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// 遍历冲突的表项: (项集状态, 终结符).
    pub fn conflicts(&self) -> impl Iterator<Item = (usize, Terminal<'a>)> {
        self.conflicts.iter().copied()
    }

    /// 使用 markdown 形式输出表格.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut header_line = "| |".to_string();
        header_line += &self
            .terms
            .iter()
            .map(|t| format!(" `{}` |", t.as_str()))
            .chain(
                self.non_terms
                    .iter()
                    .map(|nt| format!(" `{}` |", nt.as_str())),
            )
            .collect::<String>();
        let sep_line: String = String::from("| - |")
            + &std::iter::repeat_n(" - |", self.terms.len() + self.non_terms.len())
                .collect::<String>();
        let mut data_lines = String::new();
        for (i, (action_row, goto_row)) in self.action.iter().zip(self.goto.iter()).enumerate() {
            let line = format!("| $I_{{{i}}}$ |")
                + &action_row
                    .iter()
                    .map(|act| format!(" {act} |"))
                    .chain(goto_row.iter().map(|to| {
                        if let Some(to) = to {
                            format!(" {to} |")
                        } else {
                            "  |".to_string()
                        }
                    }))
                    .collect::<String>();
            data_lines += &line;
            data_lines += "\n";
        }
        format!("{header_line}\n{sep_line}\n{}", data_lines.trim_end())
    }

    /// 查询 ACTION 表, 获取当前项集状态在某个终结符下的动作.
    /// # Returns
    /// 如果项集族中没有这个状态或者文法中没有这个终结符, 那么返回 [`None`].
    #[must_use]
    pub fn action(&self, state: usize, term: Terminal) -> Option<&ActionCell> {
        let term_idx = *self.term_idxes.get(&term)?;
        let row = self.action.get(state)?;
        Some(&row[term_idx])
    }

    /// 遍历一个项集状态的所有非 [`ActionCell::Empty`] actions.
    /// 如果这个项集状态不存在, 那么返回 [`None`].
    #[must_use]
    pub fn actions(
        &self,
        state: usize,
    ) -> Option<impl Iterator<Item = (Terminal<'a>, &ActionCell)>> {
        let v = self.action.get(state)?;
        Some(v.iter().enumerate().filter_map(|(i, a)| {
            if a.is_empty() {
                None
            } else {
                Some((self.terms[i], a))
            }
        }))
    }

    /// 查询 GOTO(state, non_term), 如果 state 或者 non_term 在 GOTO 表中不存在, 那么返回 [`None`].
    /// 如果 state 没有 non_term 这个出边, 那么返回 `Some(None)`.
    #[must_use]
    pub fn goto(&self, state: usize, non_term: NonTerminal) -> Option<Option<usize>> {
        let non_term_idx = *self.non_term_idxes.get(&non_term)?;
        let row = self.goto.get(state)?;
        Some(row[non_term_idx])
    }

    #[must_use]
    pub fn family(&self) -> &Family<'a> {
        &self.family
    }

    #[must_use]
    pub fn grammar(&self) -> &'a Grammar<'a> {
        self.grammar
    }
}
