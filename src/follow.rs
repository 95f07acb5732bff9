//! follow 集计算.
//!
//! SLR(1) 分析中, 完成项 `A -> α ⋅` 只在 FOLLOW(A) 中的终结符下归约.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt::Display;

use tracing::debug;

use crate::{
    Grammar, NonTerminal, Terminal, Token,
    token::{EOF, EPSILON},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowSets<'a> {
    sets: BTreeMap<NonTerminal<'a>, BTreeSet<Terminal<'a>>>,
}

impl<'a> FollowSets<'a> {
    /// 计算文法中所有非终结符的 follow 集.
    ///
    /// - 起始符的 follow 集包含 [`EOF`].
    /// - 对于 `B -> α A β`, FIRST(β) 中除 [`EPSILON`] 以外的终结符属于 FOLLOW(A).
    /// - 如果 β 可以推导出空串并且 `B != A`, 那么 FOLLOW(B) 包含于 FOLLOW(A).
    ///
    /// 采用不动点迭代, `A`, `B` 互相位于对方产生式末尾的情况也能正常结束.
    #[must_use]
    pub fn of(grammar: &Grammar<'a>) -> Self {
        let mut sets: BTreeMap<_, BTreeSet<_>> = grammar
            .non_terminals()
            .map(|nt| (nt, BTreeSet::new()))
            .collect();
        sets.entry(grammar.symbol_start()).or_default().insert(EOF);
        let mut changed = true;
        while changed {
            changed = false;
            for prod in grammar.prods() {
                let tail = prod.tail();
                for (pos, tok) in tail.iter().enumerate() {
                    let Token::NonTerminal(nt) = *tok else {
                        continue;
                    };
                    let mut follow = grammar.first_set(tail[pos + 1..].iter().copied());
                    if follow.remove(&EPSILON) && nt != prod.head() {
                        follow.extend(sets.get(&prod.head()).into_iter().flatten().copied());
                    }
                    let set = sets.entry(nt).or_default();
                    let before = set.len();
                    set.extend(follow);
                    changed |= set.len() != before;
                }
            }
        }
        debug!("follow sets: {sets:?}");
        Self { sets }
    }

    /// 获取非终结符的 follow 集, 非终结符不在文法中时返回 [`None`].
    #[must_use]
    pub fn get(&self, nt: NonTerminal<'a>) -> Option<&BTreeSet<Terminal<'a>>> {
        self.sets.get(&nt)
    }

    /// 按非终结符的顺序遍历 follow 集.
    pub fn iter(&self) -> impl Iterator<Item = (NonTerminal<'a>, &BTreeSet<Terminal<'a>>)> {
        self.sets.iter().map(|(nt, set)| (*nt, set))
    }
}

impl Display for FollowSets<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (nt, set) in &self.sets {
            let terms: String = set.iter().map(|t| format!("{t}, ")).collect();
            writeln!(f, "FOLLOW({nt}) = {{{}}}", terms.trim_end_matches([',', ' ']))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeSet;

    use bumpalo::Bump;
    use pretty_assertions::assert_eq;

    use crate::{Grammar, Terminal, follow::FollowSets};

    fn terms<'a>(ts: &[&'a str]) -> BTreeSet<Terminal<'a>> {
        ts.iter().map(|&t| Terminal::from(t)).collect()
    }

    #[test]
    fn expression_grammar() {
        let bump = Bump::new();
        let grammar = Grammar::from_cfg(
            "S -> E
            E -> E + T | T
            T -> T * F | F
            F -> ( E ) | id",
            "S".into(),
            &bump,
        )
        .unwrap()
        .augmented();
        let follow = FollowSets::of(&grammar);
        assert_eq!(follow.get("S'".into()), Some(&terms(&["$"])));
        assert_eq!(follow.get("S".into()), Some(&terms(&["$"])));
        assert_eq!(follow.get("E".into()), Some(&terms(&["$", "+", ")"])));
        assert_eq!(follow.get("T".into()), Some(&terms(&["$", "+", ")", "*"])));
        assert_eq!(follow.get("F".into()), Some(&terms(&["$", "+", ")", "*"])));
        assert_eq!(follow.get("id".into()), None);
    }

    #[test]
    fn non_terminal_followed_by_non_terminal() {
        let bump = Bump::new();
        // A 后面紧跟 B, FOLLOW(A) 取 FIRST(B), B 可以为空, 所以还要继承 FOLLOW(S).
        let grammar = Grammar::from_cfg("S -> A B\nA -> a\nB -> b | ε", "S".into(), &bump)
            .unwrap()
            .augmented();
        let follow = FollowSets::of(&grammar);
        assert_eq!(follow.get("A".into()), Some(&terms(&["$", "b"])));
        assert_eq!(follow.get("B".into()), Some(&terms(&["$"])));
    }

    #[test]
    fn cyclic_trailing_dependency() {
        let bump = Bump::new();
        // FOLLOW(A) 依赖 FOLLOW(B), FOLLOW(B) 又依赖 FOLLOW(A).
        let grammar = Grammar::from_cfg(
            "S -> A x\nA -> b B | c\nB -> d A",
            "S".into(),
            &bump,
        )
        .unwrap()
        .augmented();
        let follow = FollowSets::of(&grammar);
        assert_eq!(follow.get("A".into()), Some(&terms(&["x"])));
        assert_eq!(follow.get("B".into()), Some(&terms(&["x"])));
        assert_eq!(
            follow.to_string().lines().next(),
            Some("FOLLOW(A) = {x}")
        );
    }
}
