use clap::Parser;
use key_calculator::{view, Calculator};
use std::io::{self, BufRead};
use tracing_subscriber::EnvFilter;

/// Keyboard driven calculator. Reads key names separated by whitespace,
/// e.g. `3 + 4 Enter`, and prints the display after each line.
#[derive(Parser, Debug)]
#[command(name = "kc", version)]
struct Args {
    /// Run this key sequence, print the display and exit.
    #[arg(short, long)]
    keys: Option<String>,
    /// Print the button grid and exit.
    #[arg(long)]
    layout: bool,
    /// Display width in pixels, used to report the fitted font size.
    #[arg(long, default_value_t = 336.0)]
    width: f64,
}

fn press_keys(calculator: &mut Calculator, line: &str) {
    for key in line.split_whitespace() {
        match view::resolve_key(key) {
            Some(action) if calculator.is_enabled(action) => calculator.dispatch(action),
            Some(action) => tracing::debug!(?action, "control disabled"),
            None => eprintln!("Unknown key \"{}\"", key),
        }
    }
}

fn print_display(calculator: &Calculator, width: f64) {
    let display = calculator.display();
    let font_size = view::fit_font_size(display.chars().count(), width);
    println!("{}", view::render_display(calculator, 20));
    tracing::debug!(font_size, "display fitted");
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut calculator = Calculator::new();

    if args.layout {
        print!("{}", view::render_buttons(&calculator));
        return Ok(());
    }

    if let Some(keys) = args.keys {
        press_keys(&mut calculator, &keys);
        print_display(&calculator, args.width);
        return Ok(());
    }

    println!("Type keys separated by spaces and hit enter");
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        press_keys(&mut calculator, &line?);
        print_display(&calculator, args.width);
        if calculator.controls_disabled() {
            println!("Press Escape or Delete to clear");
        }
    }
    Ok(())
}
