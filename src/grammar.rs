use bumpalo::Bump;
use std::{
    collections::{BTreeSet, HashMap, HashSet},
    fmt::{Debug, Display},
};

use crate::{
    NonTerminal, Terminal, Token,
    error::{Error, ParseProductionError},
    token::{EOF, EPSILON},
};

#[derive(Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Production<'a> {
    // 产生式 `->` 左侧内容.
    head: NonTerminal<'a>,
    // 产生式 `->` 右侧内容.
    tail: Vec<Token<'a>>,
}

impl Debug for Production<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Production")
            .field(&format_args!(
                "{:?} -> {}",
                self.head,
                self.tail
                    .iter()
                    .map(|t| format!("{:?} ", t))
                    .collect::<String>()
                    .trim_end()
            ))
            .finish()
    }
}

impl Display for Production<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tail = if self.is_empty() {
            EPSILON.to_string()
        } else {
            self.tail_without_eps()
                .map(|t| format!("{} ", t))
                .collect::<String>()
                .trim_end()
                .to_string()
        };
        f.pad(&format!("{} -> {}", self.head, tail))
    }
}

impl<'a> Production<'a> {
    #[must_use]
    pub fn new(head: NonTerminal<'a>, tail: Vec<Token<'a>>) -> Self {
        Self { head, tail }
    }

    #[must_use]
    pub fn head(&self) -> NonTerminal<'a> {
        self.head
    }

    #[must_use]
    pub fn tail(&self) -> &[Token<'a>] {
        &self.tail
    }

    pub fn tail_without_eps(&self) -> impl Iterator<Item = &Token<'a>> {
        self.tail
            .iter()
            .filter(|tok| !matches!(tok, Token::Terminal(EPSILON)))
    }

    /// 产生式尾部的 tokens 数量, [`EPSILON`] 不算长度.
    /// 归约时从状态栈中弹出的状态数量就是这个长度.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tail_without_eps().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 上下文无关文法.
///
/// 产生式和增广后的起始符都分配在调用方提供的 [`Bump`] 中,
/// 后续的项集族也分配在同一个 [`Bump`] 里.
#[derive(Debug, Clone)]
pub struct Grammar<'a> {
    bump: &'a Bump,
    prods: Vec<&'a Production<'a>>,
    prod_indexes: HashMap<&'a Production<'a>, usize>,
    tokens: BTreeSet<Token<'a>>,
    start: NonTerminal<'a>,
    augmented: bool,
    /// 各个非终结符的 first 集, 构造文法时一次性算好.
    /// 可以推导出空串的非终结符, 其 first 集中包含 [`EPSILON`].
    first_sets: HashMap<NonTerminal<'a>, BTreeSet<Terminal<'a>>>,
}

impl PartialEq for Grammar<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.prods == other.prods && self.start == other.start && self.tokens == other.tokens
    }
}

impl Eq for Grammar<'_> {}

impl<'a> Grammar<'a> {
    #[must_use]
    pub(crate) fn bump(&self) -> &'a Bump {
        self.bump
    }

    /// 按产生式编号遍历产生式.
    pub fn prods(&self) -> &[&'a Production<'a>] {
        &self.prods
    }

    /// 获取产生式的编号, 如果产生式在文法中不存在, 那么返回 [`None`].
    #[must_use]
    pub fn index_of_prod(&self, prod: &Production<'a>) -> Option<usize> {
        self.prod_indexes.get(prod).copied()
    }

    #[must_use]
    pub fn symbol_start(&self) -> NonTerminal<'a> {
        self.start
    }

    #[must_use]
    pub fn is_augmented(&self) -> bool {
        self.augmented
    }

    /// 文法中出现的所有符号, 包括 [`EPSILON`] 和 [`EOF`].
    #[must_use]
    pub fn tokens(&self) -> &BTreeSet<Token<'a>> {
        &self.tokens
    }

    /// 所有终结符, 包括 [`EOF`], 不包括 [`EPSILON`].
    pub fn terminals(&self) -> impl Iterator<Item = Terminal<'a>> {
        self.tokens
            .iter()
            .filter_map(Token::as_term)
            .filter(|t| *t != EPSILON)
    }

    pub fn non_terminals(&self) -> impl Iterator<Item = NonTerminal<'a>> {
        self.tokens.iter().filter_map(Token::as_non_term)
    }

    #[must_use]
    pub fn augmented(mut self) -> Self {
        if self.augmented {
            return self;
        }
        // 起始符加上 `'`, 如果和已有的符号 (终结符或者非终结符) 重名就继续加.
        let mut ident = format!("{}'", self.start.as_str());
        while self.tokens.iter().any(|t| t.as_str() == ident) {
            ident.push('\'');
        }
        let augmented_start = NonTerminal::from(&*self.bump.alloc_str(&ident));
        self.prod_indexes.values_mut().for_each(|x| *x += 1);
        let augmented_prod = &*self
            .bump
            .alloc(Production::new(augmented_start, vec![self.start.into()]));
        self.prods.insert(0, augmented_prod);
        self.prod_indexes.insert(augmented_prod, 0);
        self.tokens.insert(augmented_start.into());
        let first_sets = Self::calc_first_sets(&self.prods);
        Self {
            start: augmented_start,
            augmented: true,
            first_sets,
            ..self
        }
    }

    /// 从 "非终结符 -> 候选式列表" 的映射构建文法.
    ///
    /// 所有映射的键都是非终结符, 候选式中的其他符号一律当作终结符.
    /// 候选式中的 `ε` 表示空串, 空的候选式同样表示空串.
    pub fn from_rules<R, A, B>(rules: R, start: NonTerminal<'a>, bump: &'a Bump) -> Result<Self, Error>
    where
        R: IntoIterator<Item = (&'a str, A)>,
        A: IntoIterator<Item = B>,
        B: IntoIterator<Item = &'a str>,
    {
        let rules = rules
            .into_iter()
            .enumerate()
            .map(|(idx, (head, alts))| {
                let alts: Vec<Vec<&'a str>> =
                    alts.into_iter().map(|b| b.into_iter().collect()).collect();
                (idx, head.trim(), alts)
            })
            .collect();
        Self::build(rules, start, bump)
    }

    /// 解析形如 `A -> a B | b` 的文法, 每行一个非终结符.
    pub fn from_cfg(s: &'a str, start: NonTerminal<'a>, bump: &'a Bump) -> Result<Self, Error> {
        let mut rules = Vec::new();
        for (line_num, line) in s
            .lines()
            .enumerate()
            .filter(|(_, s)| s.chars().any(|c| !c.is_whitespace()))
        {
            let (head, tails) = line.split_once("->").ok_or(Error::parse_production_error(
                line_num,
                ParseProductionError::NoArrow,
            ))?;
            let alts: Vec<Vec<&str>> = tails
                .split('|')
                .map(|tail| tail.split_ascii_whitespace().collect())
                .collect();
            rules.push((line_num, head.trim(), alts));
        }
        Self::build(rules, start, bump)
    }

    /// (行号, 头部, 候选式列表)
    fn build(
        rules: Vec<(usize, &'a str, Vec<Vec<&'a str>>)>,
        start: NonTerminal<'a>,
        bump: &'a Bump,
    ) -> Result<Self, Error> {
        let mut tokens: BTreeSet<Token<'_>> = [EPSILON.into(), EOF.into()].into();
        let mut non_terminals = HashSet::new();
        // 先找出所有的非终结符.
        for &(line_num, head, _) in &rules {
            if head.is_empty() {
                Err(Error::parse_production_error(
                    line_num,
                    ParseProductionError::EmptyHead,
                ))?
            }
            non_terminals.insert(head);
            tokens.insert(NonTerminal::from(head).into());
        }
        if !non_terminals.contains(&start.as_str()) {
            Err(Error::parse_production_error(
                0,
                ParseProductionError::StartSymbolNotFound,
            ))?
        }
        let mut prods = Vec::new();
        let mut prod_indexes = HashMap::new();
        for (line_num, head, alts) in rules {
            for alt in alts {
                if alt.contains(&EOF.as_str()) {
                    Err(Error::parse_production_error(
                        line_num,
                        ParseProductionError::EofInBody,
                    ))?
                }
                let tail = alt
                    .into_iter()
                    .map(|s| {
                        if non_terminals.contains(&s) {
                            Token::from(NonTerminal::from(s))
                        } else {
                            Token::from(Terminal::from(s))
                        }
                    })
                    .inspect(|tok| {
                        tokens.insert(*tok);
                    })
                    .collect();
                let prod = Production::new(NonTerminal::from(head), tail);
                // 重复的候选式只保留第一次出现的编号.
                if prod_indexes.contains_key(&prod) {
                    continue;
                }
                let prod = &*bump.alloc(prod);
                prod_indexes.insert(prod, prods.len());
                prods.push(prod);
            }
        }
        let first_sets = Self::calc_first_sets(&prods);
        Ok(Grammar {
            bump,
            prods,
            prod_indexes,
            tokens,
            start,
            augmented: false,
            first_sets,
        })
    }

    /// 获取以某个非终结符为头部的所有产生式, 结果可能为空.
    pub fn prods_of(&self, nt: NonTerminal<'a>) -> impl Iterator<Item = &'a Production<'a>> {
        self.prods.iter().copied().filter(move |p| p.head == nt)
    }

    /// 不动点迭代计算所有非终结符的 first 集, 左递归不需要特殊处理.
    fn calc_first_sets(
        prods: &[&'a Production<'a>],
    ) -> HashMap<NonTerminal<'a>, BTreeSet<Terminal<'a>>> {
        let mut first_sets: HashMap<_, BTreeSet<_>> =
            prods.iter().map(|p| (p.head, BTreeSet::new())).collect();
        let mut changed = true;
        while changed {
            changed = false;
            for prod in prods {
                let fs = Self::first_of_seq(&first_sets, prod.tail.iter().copied());
                let set = first_sets.entry(prod.head).or_default();
                let before = set.len();
                set.extend(fs);
                changed |= set.len() != before;
            }
        }
        first_sets
    }

    fn first_of_seq(
        first_sets: &HashMap<NonTerminal<'a>, BTreeSet<Terminal<'a>>>,
        seq: impl Iterator<Item = Token<'a>>,
    ) -> BTreeSet<Terminal<'a>> {
        let mut first_set = BTreeSet::new();
        for tok in seq {
            match tok {
                Token::Terminal(EPSILON) => {}
                Token::Terminal(t) => {
                    first_set.insert(t);
                    return first_set;
                }
                Token::NonTerminal(nt) => {
                    let fs = first_sets.get(&nt);
                    first_set.extend(fs.into_iter().flatten().filter(|t| **t != EPSILON));
                    if !fs.is_some_and(|fs| fs.contains(&EPSILON)) {
                        return first_set;
                    }
                }
            }
        }
        // 整个序列都可以推导出空串.
        first_set.insert(EPSILON);
        first_set
    }

    /// 计算一个 token 序列的 first 集.
    ///
    /// 如果 `seq` 可以推导出空串 (包括 `seq` 为空), 结果中包含 [`EPSILON`].
    pub fn first_set(&self, seq: impl Iterator<Item = Token<'a>>) -> BTreeSet<Terminal<'a>> {
        Self::first_of_seq(&self.first_sets, seq)
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeSet;

    use crate::{
        NonTerminal, Production, Terminal, Token,
        error::{Error, ParseProductionError},
        grammar::Grammar,
        token::{EOF, EPSILON},
    };
    use bumpalo::Bump;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_productions() {
        let input = "
            program -> compoundstmt
            stmt -> ifstmt | whilestmt | assgstmt
            compoundstmt -> { stmts }
        ";
        let bump = Bump::new();
        let grammar = Grammar::from_cfg(input, "program".into(), &bump)
            .unwrap()
            .augmented();

        let prods = [
            Production::new(
                "program'".into(),
                vec![NonTerminal::from("program").into()],
            ),
            Production::new(
                "program".into(),
                vec![NonTerminal::from("compoundstmt").into()],
            ),
            Production::new("stmt".into(), vec![Terminal::from("ifstmt").into()]),
            Production::new("stmt".into(), vec![Terminal::from("whilestmt").into()]),
            Production::new("stmt".into(), vec![Terminal::from("assgstmt").into()]),
            Production::new(
                "compoundstmt".into(),
                vec![
                    Terminal::from("{").into(),
                    Terminal::from("stmts").into(),
                    Terminal::from("}").into(),
                ],
            ),
        ];

        let tokens: BTreeSet<Token<'static>> = [
            NonTerminal::from("program'").into(),
            NonTerminal::from("program").into(),
            NonTerminal::from("compoundstmt").into(),
            NonTerminal::from("stmt").into(),
            EPSILON.into(),
            EOF.into(),
            Terminal::from("ifstmt").into(),
            Terminal::from("whilestmt").into(),
            Terminal::from("assgstmt").into(),
            Terminal::from("{").into(),
            Terminal::from("}").into(),
            Terminal::from("stmts").into(),
        ]
        .into();

        assert_eq!(grammar.start, "program'".into());
        assert!(grammar.is_augmented());
        assert_eq!(grammar.prods, prods.iter().collect::<Vec<_>>());
        assert_eq!(grammar.tokens, tokens);
        assert_eq!(grammar.index_of_prod(&prods[4]), Some(4));
        assert_eq!(
            grammar.terminals().collect::<Vec<_>>(),
            ["$", "assgstmt", "ifstmt", "stmts", "whilestmt", "{", "}"]
                .map(Terminal::from)
                .to_vec()
        );
        assert_eq!(
            grammar.prods_of("stmt".into()).count(),
            3,
            "stmt has three alternatives"
        );
    }

    #[test]
    fn from_rules_matches_from_cfg() {
        let bump = Bump::new();
        let from_cfg = Grammar::from_cfg("E -> E + T | T\nT -> id", "E".into(), &bump).unwrap();
        let from_rules = Grammar::from_rules(
            [
                ("E", vec![vec!["E", "+", "T"], vec!["T"]]),
                ("T", vec![vec!["id"]]),
            ],
            "E".into(),
            &bump,
        )
        .unwrap();
        assert_eq!(from_cfg, from_rules);
    }

    #[test]
    fn malformed_cfg() {
        let bump = Bump::new();
        assert_eq!(
            Grammar::from_cfg("S -> a\nS a b", "S".into(), &bump),
            Err(Error::ParseProductionError {
                line: 1,
                cause: ParseProductionError::NoArrow
            })
        );
        assert_eq!(
            Grammar::from_cfg("S -> a\n -> b", "S".into(), &bump),
            Err(Error::ParseProductionError {
                line: 1,
                cause: ParseProductionError::EmptyHead
            })
        );
        assert_eq!(
            Grammar::from_cfg("S -> a", "T".into(), &bump),
            Err(Error::ParseProductionError {
                line: 0,
                cause: ParseProductionError::StartSymbolNotFound
            })
        );
    }

    #[test]
    fn augmented_start_avoids_clash() {
        let bump = Bump::new();
        let grammar = Grammar::from_cfg("S -> S' a | b\nS' -> c", "S".into(), &bump)
            .unwrap()
            .augmented();
        assert_eq!(grammar.symbol_start(), "S''".into());
        assert_eq!(grammar.prods()[0].to_string(), "S'' -> S");

        // `S'` 只作为终结符出现时同样不能使用.
        let grammar = Grammar::from_cfg("S -> S' a | b", "S".into(), &bump)
            .unwrap()
            .augmented();
        assert_eq!(grammar.symbol_start(), "S''".into());
        let names: Vec<_> = grammar.tokens().iter().map(|t| t.as_str()).collect();
        assert_eq!(names.iter().filter(|n| **n == "S'").count(), 1);
        assert_eq!(names.iter().filter(|n| **n == "S''").count(), 1);
    }

    #[test]
    fn eof_in_body() {
        let bump = Bump::new();
        assert_eq!(
            Grammar::from_cfg("S -> A\nA -> a $", "S".into(), &bump),
            Err(Error::ParseProductionError {
                line: 1,
                cause: ParseProductionError::EofInBody
            })
        );
        assert_eq!(
            Grammar::from_rules([("S", vec![vec!["a", "$"]])], "S".into(), &bump),
            Err(Error::ParseProductionError {
                line: 0,
                cause: ParseProductionError::EofInBody
            })
        );
        // 作为普通终结符的 `$$` 不受影响.
        assert!(Grammar::from_cfg("S -> a $$", "S".into(), &bump).is_ok());
    }

    #[test]
    fn first() {
        let bump = Bump::new();
        let grammar = Grammar::from_cfg(
            "program -> stmts
            stmts -> { stmt stmts } | stmt | ε | program",
            "program".into(),
            &bump,
        )
        .unwrap()
        .augmented();
        let stmt = Terminal::from("stmt");
        let stmts = NonTerminal::from("stmts");
        let programprime = NonTerminal::from("program'");
        let brace_l = Terminal::from("{");
        assert_eq!(
            grammar.first_set([stmts.into()].into_iter()),
            [brace_l, stmt, EPSILON].into()
        );
        assert_eq!(
            grammar.first_set([programprime.into()].into_iter()),
            [brace_l, stmt, EPSILON].into()
        );
        assert_eq!(
            grammar.first_set([stmts.into(), Terminal::from("x").into()].into_iter()),
            [brace_l, stmt, Terminal::from("x")].into()
        );
        assert_eq!(grammar.first_set([].into_iter()), [EPSILON].into());
    }

    #[test]
    fn epsilon_len() {
        let prod = Production::new("A".into(), vec![EPSILON.into()]);
        assert_eq!(prod.len(), 0);
        assert_eq!(prod.to_string(), "A -> ε");
    }
}
