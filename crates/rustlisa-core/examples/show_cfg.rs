// Prints the lowered CFGs of a few sample modules
//
// RUST_LOG=rustlisa_core=debug cargo run --example show_cfg
use rustlisa_core::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let samples = vec![
        (
            "rectangle.rs",
            r#"
struct Rect { width: u32, height: u32 }

impl Rect {
    fn new(width: u32, height: u32) -> Self {
        Rect { width, height }
    }

    fn area(&self) -> u32 {
        self.width * self.height
    }

    fn grow(&mut self, by: u32) {
        if by == 0 {
            return;
        }
        self.width += by;
        self.height += by;
    }
}

fn total(rects: &[Rect]) -> u32 {
    let mut sum = 0;
    for r in rects {
        sum += r.area();
    }
    sum
}
"#,
        ),
        (
            "message.rs",
            r#"
enum Message { Quit, Move { x: i32, y: i32 }, Write(&'static str) }

fn describe(m: &Message) -> i32 {
    match m {
        Message::Quit => 0,
        Message::Move { x, y } => x + y,
        Message::Write(_) => -1,
    }
}

fn build() -> Message {
    let first = Message::Move { y: 2, x: 1 };
    first
}
"#,
        ),
    ];

    let frontend = RustFrontend::default();
    for (name, source) in samples {
        println!("\n=== Module: {} ===", name);
        let program = frontend.build_source(source, name)?;
        for unit in program.units() {
            println!("unit {} ({:?})", unit.name, unit.kind);
            for global in unit.globals() {
                println!("  global {}: {}", global.name, program.types().display(global.ty));
            }
            for cfg in unit.cfgs() {
                print!("{}", cfg);
            }
        }
        for diagnostic in program.diagnostics() {
            println!("skipped {}", diagnostic);
        }
    }
    Ok(())
}
