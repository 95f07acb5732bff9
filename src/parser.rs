//! LR 驱动程序.
//!
//! 参考龙书中文第二版 P160
//! ```text
//! 令 a 为 w$ 的第一个符号;
//! while (1) { /* 永远重复 */
//!     令 s 是栈顶的状态;
//!     if (ACTION[s, a] = 移入 t) {
//!         将 t 压入栈中;
//!         令 a 为下一个输入符号;
//!     } else if (ACTION[s, a] = 归约 A -> beta) {
//!         从栈中弹出 | beta | 个符号;
//!         令 t 为当前的栈顶状态;
//!         将 GOTO[t, A] 压入栈中;
//!     } else if (ACTION[s, a] = 接受) break; /* 语法分析完成 */
//!     else 报错;
//! }
//! ```

use std::iter;

use tracing::{debug, info};

use crate::{ActionCell, Table, Terminal, error::Error, token::EOF};

/// 基于 [`Table`] 的移入-归约分析器, 只给出接受或者拒绝.
#[derive(Debug, Clone, Copy)]
pub struct Parser<'t, 'a> {
    table: &'t Table<'a>,
}

impl<'t, 'a> Parser<'t, 'a> {
    /// 分析表中存在冲突时返回 [`Error::Conflict`], 报告第一个冲突的表项.
    pub fn new(table: &'t Table<'a>) -> Result<Self, Error> {
        if let Some((state, term)) = table.conflicts().next() {
            Err(Error::Conflict {
                state,
                terminal: term.as_str().to_string(),
            })?
        }
        Ok(Self { table })
    }

    #[must_use]
    pub fn table(&self) -> &'t Table<'a> {
        self.table
    }

    /// 分析一个终结符序列, 序列末尾会自动补上 [`EOF`], 第一个 [`EOF`] 之后的输入被忽略.
    ///
    /// 返回输入是否被文法接受.
    pub fn parse<'s>(&self, input: impl IntoIterator<Item = Terminal<'s>>) -> bool {
        let mut input = input
            .into_iter()
            .take_while(|t| *t != EOF)
            .chain(iter::once(EOF))
            .peekable();
        // 状态栈, 放入初始项集.
        let mut stack = vec![0];
        loop {
            let (Some(&top), Some(&term)) = (stack.last(), input.peek()) else {
                return false;
            };
            let action = self.table.action(top, term);
            debug!("top: I_{top}, term: {term}, action: {action:?}");
            match action {
                Some(ActionCell::Shift(state)) => {
                    stack.push(*state);
                    input.next();
                }
                Some(ActionCell::Reduce(prod)) => {
                    let Some(prod) = self.table.grammar().prods().get(*prod) else {
                        return false;
                    };
                    // 从 A -> dot beta 一路走到 A -> beta dot, 栈中新增了 |beta| 个状态.
                    let Some(rest) = stack.len().checked_sub(prod.len()) else {
                        return false;
                    };
                    stack.truncate(rest);
                    let Some(&top) = stack.last() else {
                        return false;
                    };
                    let Some(Some(to)) = self.table.goto(top, prod.head()) else {
                        debug!("no goto on I_{top}, {}", prod.head());
                        return false;
                    };
                    debug!("reduce {prod}, goto I_{to}");
                    stack.push(to);
                }
                Some(ActionCell::Accept) => {
                    info!("input accepted");
                    return true;
                }
                Some(ActionCell::Empty | ActionCell::Conflict(_, _)) | None => {
                    info!("input rejected on I_{top}, term: {term}");
                    return false;
                }
            }
        }
    }

    /// 以空白分隔的终结符序列.
    pub fn parse_str(&self, input: &str) -> bool {
        self.parse(input.split_whitespace().map(Terminal::from))
    }
}

#[cfg(test)]
mod test {
    use bumpalo::Bump;

    use crate::{Grammar, Parser, Table, Terminal, error::Error};
    use pretty_assertions::assert_eq;

    const EXPR: &str = "S -> E
        E -> E + T | T
        T -> T * F | F
        F -> ( E ) | id";

    #[test]
    fn expression_grammar() {
        let bump = Bump::new();
        let grammar = Grammar::from_cfg(EXPR, "S".into(), &bump)
            .unwrap()
            .augmented();
        for table in [Table::slr(&grammar).unwrap(), Table::lr1(&grammar).unwrap()] {
            let parser = Parser::new(&table).unwrap();
            assert!(parser.parse_str("id"));
            assert!(parser.parse_str("id + id * id"));
            assert!(parser.parse_str("( id + id ) * id"));
            assert!(parser.parse_str("id $ id id"));
            assert!(!parser.parse_str("id +"));
            assert!(!parser.parse_str(""));
            assert!(!parser.parse_str("( id"));
            assert!(!parser.parse_str("id id"));
            assert!(!parser.parse_str("id - id"));
            assert!(parser.parse(["id", "*", "id"].map(Terminal::from)));
        }
    }

    #[test]
    fn slr_and_lr1_agree() {
        let bump = Bump::new();
        let grammar = Grammar::from_cfg(EXPR, "S".into(), &bump)
            .unwrap()
            .augmented();
        let slr = Table::slr(&grammar).unwrap();
        let lr1 = Table::lr1(&grammar).unwrap();
        let (slr, lr1) = (Parser::new(&slr).unwrap(), Parser::new(&lr1).unwrap());
        for input in [
            "id * ( id + id )",
            "( ( id ) )",
            "id + + id",
            "* id",
            ")",
            "id * id * id + id",
        ] {
            assert_eq!(slr.parse_str(input), lr1.parse_str(input), "{input}");
        }
    }

    #[test]
    fn epsilon_reduce_pops_nothing() {
        let bump = Bump::new();
        // A -> ε 归约时不弹出状态, B -> x y z 归约时弹出 3 个.
        let grammar = Grammar::from_cfg("S -> A B\nA -> ε | a\nB -> x y z", "S".into(), &bump)
            .unwrap()
            .augmented();
        for table in [Table::slr(&grammar).unwrap(), Table::lr1(&grammar).unwrap()] {
            let parser = Parser::new(&table).unwrap();
            assert!(parser.parse_str("x y z"));
            assert!(parser.parse_str("a x y z"));
            assert!(!parser.parse_str("a"));
            assert!(!parser.parse_str("x y"));
        }
    }

    #[test]
    fn nullable_start_accepts_empty() {
        let bump = Bump::new();
        let grammar = Grammar::from_cfg("S -> ( S ) S | ε", "S".into(), &bump)
            .unwrap()
            .augmented();
        let table = Table::lr1(&grammar).unwrap();
        let parser = Parser::new(&table).unwrap();
        assert!(parser.parse_str(""));
        assert!(parser.parse_str("( ) ( ( ) )"));
        assert!(!parser.parse_str("( ( )"));
    }

    #[test]
    fn conflicting_table_is_refused() {
        let bump = Bump::new();
        let grammar = Grammar::from_cfg("S -> L = R | R\nL -> * R | id\nR -> L", "S".into(), &bump)
            .unwrap()
            .augmented();
        let slr = Table::slr(&grammar).unwrap();
        assert_eq!(
            Parser::new(&slr).map(|_| ()),
            Err(Error::Conflict {
                state: 3,
                terminal: "=".to_string()
            })
        );
        let lr1 = Table::lr1(&grammar).unwrap();
        let parser = Parser::new(&lr1).unwrap();
        assert!(parser.parse_str("id = * id"));
        assert!(parser.parse_str("* * id"));
        assert!(!parser.parse_str("id = = id"));
    }
}
