//! Generate figures and tables for the paper on tidally-synchronized
//! binaries in the Kepler field.
//!
//! Figure-name tokens select which outputs to build; `all` runs every
//! registered function in dictionary order.
//!
//! ```text
//! cargo run --release -- kexcess-hr binary-fractions
//! cargo run --release -- --list-figs
//! cargo run --release -- all
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;

use catalogs::CatalogStore;
use rotpaper::figures;
use rotpaper::output::OutputPaths;
use rotpaper::Context;

#[derive(Parser, Debug)]
#[command(
    name = "rotpaper",
    about = "Generate figures and tables for the tidally-synchronized binary paper",
    long_about = None
)]
struct Args {
    /// Figure names to generate; `all` runs everything in dictionary order
    figs: Vec<String>,

    /// List the available figure names and exit
    #[arg(long)]
    list_figs: bool,

    /// Catalog data directory (defaults to $ROTPAPER_DATA, then ./data)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Output directory (defaults to $ROTPAPER_OUT, then ./paper)
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let registry = figures::registry();
    if args.list_figs || args.figs.is_empty() {
        for name in registry.keys() {
            println!("{name}");
        }
        return Ok(());
    }

    let store = match &args.data_dir {
        Some(dir) => CatalogStore::new(dir.clone())?,
        None => CatalogStore::from_env()?,
    };
    let out = match &args.out_dir {
        Some(dir) => OutputPaths::new(dir.clone()),
        None => OutputPaths::from_env(),
    };
    let ctx = Context::new(store, out);

    for name in &args.figs {
        if name == "all" {
            for (token, fig) in &registry {
                log::info!("generating {token}");
                fig(&ctx).with_context(|| format!("while generating {token}"))?;
            }
            break;
        }
        figures::run(name, &ctx).with_context(|| format!("while generating {name}"))?;
    }
    Ok(())
}
