use std::io::{self, Read};

use bumpalo::Bump;
use clap::{Parser as _, ValueEnum};
use lr_tables::{Grammar, Lr1, Parser, Slr, Table};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{Layer, fmt, layer::SubscriberExt, registry, util::SubscriberInitExt};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// SLR(1) 分析表
    Slr,
    /// 规范 LR(1) 分析表
    Lr1,
}

/// 从标准输入读取文法 (每行 `A -> a B | b`), 输出项集族和分析表.
#[derive(clap::Parser)]
struct AppArgs {
    #[clap(short, long)]
    symbol_start: String,
    #[clap(short, long, value_enum, default_value_t = Mode::Lr1)]
    mode: Mode,
    /// 待分析的输入, 终结符之间以空白分隔, 可以给出多次.
    #[clap(short, long)]
    input: Vec<String>,
    #[clap(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = AppArgs::parse();
    let level = if args.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let layer = fmt::layer()
        .without_time()
        .with_writer(io::stderr)
        .with_filter(level);
    registry().with(layer).init();

    let mut inp = String::new();
    io::stdin().read_to_string(&mut inp)?;
    let bump = Bump::new();
    let grammar =
        Grammar::from_cfg(&inp, args.symbol_start.as_str().into(), &bump)?.augmented();
    for (idx, prod) in grammar.prods().iter().enumerate() {
        println!("{idx:>4} {prod}");
    }
    println!();
    let table = match args.mode {
        Mode::Slr => {
            let slr = Slr::new(&grammar);
            println!("{}", slr.follow());
            Table::build(&grammar, &slr)?
        }
        Mode::Lr1 => Table::build(&grammar, &Lr1)?,
    };
    let family = table.family();
    for (from, is) in family.item_sets().iter().enumerate() {
        println!("I_{from}:");
        for item in is.items() {
            println!("{item}");
        }
        println!("actions:");
        for (term, act) in table.actions(from).into_iter().flatten() {
            println!("{term} {act}");
        }
        println!("gotos:");
        for (tok, to) in family.gotos_of(from).into_iter().flatten() {
            println!("I_{from} -- {tok} --> I_{to}");
        }
        println!();
    }
    println!("--- Table ---");
    println!("{}", table.to_markdown());
    for (state, term) in table.conflicts() {
        println!("conflict: I_{state}, {term}");
    }

    if !args.input.is_empty() {
        let parser = Parser::new(&table)?;
        println!();
        for input in &args.input {
            let verdict = if parser.parse_str(input) {
                "accept"
            } else {
                "reject"
            };
            println!("{input}: {verdict}");
        }
    }
    Ok(())
}
