//! LR 分析表的构建与驱动.
//!
//! 从上下文无关文法出发, 构建规范项集族, 得到 SLR(1) 或者规范 LR(1) 的
//! ACTION / GOTO 表, 再用移入-归约分析器判断输入是否被文法接受.
//!
//! ```
//! use bumpalo::Bump;
//! use lr_tables::{Grammar, Parser, Table};
//!
//! let bump = Bump::new();
//! let grammar = Grammar::from_cfg("E -> E + T | T\nT -> id", "E".into(), &bump)
//!     .unwrap()
//!     .augmented();
//! let table = Table::lr1(&grammar).unwrap();
//! let parser = Parser::new(&table).unwrap();
//! assert!(parser.parse_str("id + id"));
//! assert!(!parser.parse_str("id +"));
//! ```

pub mod error;
pub mod follow;
pub mod grammar;
pub mod item;
pub mod lookahead;
pub mod parser;
pub mod table;
pub mod token;

pub use follow::FollowSets;
pub use grammar::{Grammar, Production};
pub use item::{Family, Item, ItemSet};
pub use lookahead::{Lookahead, Lr1, Slr};
pub use parser::Parser;
pub use table::{ActionCell, Table};
pub use token::{EOF, EPSILON, NonTerminal, Terminal, Token};
