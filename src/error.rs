#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum Error {
    #[error("Error parsing productions, line: {line}, cause: {cause:?}.")]
    ParseProductionError {
        line: usize,
        cause: ParseProductionError,
    },
    #[error("Grammar may be not augmented")]
    GrammarNotAugmented,
    /// 分析表中存在冲突的表项, 说明文法不是当前分析方法能处理的文法.
    #[error("Conflicting actions in state {state} on terminal `{terminal}`.")]
    Conflict { state: usize, terminal: String },
}

#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum ParseProductionError {
    #[error("No arrow in production line")]
    NoArrow,
    #[error("Production head is empty")]
    EmptyHead,
    #[error("Start symbol not found")]
    StartSymbolNotFound,
    /// `$` 是输入结束符, 不能出现在产生式尾部.
    #[error("End of input symbol `$` in production body")]
    EofInBody,
}

impl Error {
    pub(crate) fn parse_production_error(line: usize, cause: ParseProductionError) -> Self {
        Self::ParseProductionError { line, cause }
    }
}
