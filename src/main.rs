use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;

mod category;
mod clip;
mod context;
mod error;
mod generate;
mod output;
mod processor;
mod resolution;
mod size_catalog;
mod source;
mod transform;

use category::Category;
use generate::GenerateOptions;
use output::OutputToggles;
use source::SourceKey;

#[derive(Debug, Parser)]
#[clap(
    name = "pwa-icon-gen",
    version,
    about = "Generate web app icons, <head> tags and manifest icon entries"
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate icons, the HTML snippet and the manifest fragment.
    GenerateIcons(GenerateArgs),
    /// Write the bundled size data, as a starting point for --alternate-data.
    GetData(GetDataArgs),
}

#[derive(Debug, Args)]
struct GenerateArgs {
    /// Path to the base icon (square SVG, or a PNG of at least 1024x1024).
    #[clap(value_name = "BASE_ICON")]
    base_icon: PathBuf,

    /// Icon for Android maskable icons; falls back to the base icon.
    #[clap(short = 'm', long, value_name = "FILE")]
    masked_icon: Option<PathBuf>,

    /// Icon for Android monochrome icons; falls back to the masked icon.
    #[clap(short = 'M', long, value_name = "FILE")]
    masked_monochrome_icon: Option<PathBuf>,

    /// Icon for Apple dark mode; falls back to the base icon.
    #[clap(short = 'a', long, value_name = "FILE")]
    apple_darkmode_icon: Option<PathBuf>,

    /// Icon for Apple tinted icons; falls back to the dark mode icon.
    #[clap(short = 't', long, value_name = "FILE")]
    apple_tinted_icon: Option<PathBuf>,

    /// Image for MS tiles (wide tiles included); falls back to the base icon.
    #[clap(long, value_name = "FILE")]
    tile_rect_image: Option<PathBuf>,

    /// File name prefix of every generated icon.
    #[clap(long, default_value = "apple-touch-icon")]
    prefix: String,

    /// Directory the icons are written to.
    #[clap(short, long, value_name = "DIR", default_value = "./assets")]
    destination_dir: PathBuf,

    /// Directory of the page the icons are linked from; the HTML snippet and
    /// manifest fragment go here.
    #[clap(long, value_name = "DIR", default_value = ".")]
    html_destination: PathBuf,

    /// File name of the HTML snippet.
    #[clap(long, default_value = "paste-content-in-site-head-tags.html")]
    html_file_name: String,

    /// Size data to use instead of the bundled one (see `get-data`).
    #[clap(long, value_name = "JSON")]
    alternate_data: Option<PathBuf>,

    /// Background for opaque icons (CSS color format).
    #[clap(long, default_value = "#ffffff")]
    background_color: String,

    #[clap(flatten)]
    categories: CategoryFlags,

    /// Don't write the HTML snippet.
    #[clap(long)]
    no_html: bool,

    /// Don't write the manifest fragment.
    #[clap(long)]
    no_manifest: bool,

    /// Don't write images unless a category is enabled explicitly; HTML and
    /// manifest metadata are still produced.
    #[clap(long)]
    no_icons: bool,
}

/// `--x` / `--no-x` pairs; the last one given wins.
#[derive(Debug, Args)]
struct CategoryFlags {
    /// Generate Apple touch icons.
    #[clap(long, overrides_with = "no_apple_touch")]
    apple_touch: bool,
    #[clap(long, overrides_with = "apple_touch", hide = true)]
    no_apple_touch: bool,

    /// Generate Android maskable icons.
    #[clap(long, overrides_with = "no_masked")]
    masked: bool,
    #[clap(long, overrides_with = "masked", hide = true)]
    no_masked: bool,

    /// Generate Android monochrome icons.
    #[clap(long, overrides_with = "no_monochrome")]
    monochrome: bool,
    #[clap(long, overrides_with = "monochrome", hide = true)]
    no_monochrome: bool,

    /// Generate Apple dark mode icons.
    #[clap(long, overrides_with = "no_darkmode")]
    darkmode: bool,
    #[clap(long, overrides_with = "darkmode", hide = true)]
    no_darkmode: bool,

    /// Generate Apple tinted icons.
    #[clap(long, overrides_with = "no_tinted")]
    tinted: bool,
    #[clap(long, overrides_with = "tinted", hide = true)]
    no_tinted: bool,

    /// Generate macOS icons.
    #[clap(long, overrides_with = "no_macos")]
    macos: bool,
    #[clap(long, overrides_with = "macos", hide = true)]
    no_macos: bool,

    /// Generate MS tiles.
    #[clap(long, overrides_with = "no_ms_tiles")]
    ms_tiles: bool,
    #[clap(long, overrides_with = "ms_tiles", hide = true)]
    no_ms_tiles: bool,
}

impl CategoryFlags {
    fn explicit(&self) -> BTreeMap<Category, bool> {
        [
            (Category::AppleTouch, self.apple_touch, self.no_apple_touch),
            (Category::Masked, self.masked, self.no_masked),
            (Category::Monochrome, self.monochrome, self.no_monochrome),
            (Category::DarkMode, self.darkmode, self.no_darkmode),
            (Category::Tinted, self.tinted, self.no_tinted),
            (Category::MacOs, self.macos, self.no_macos),
            (Category::MsTiles, self.ms_tiles, self.no_ms_tiles),
        ]
        .into_iter()
        .filter_map(|(category, on, off)| match (on, off) {
            (true, _) => Some((category, true)),
            (_, true) => Some((category, false)),
            _ => None,
        })
        .collect()
    }
}

#[derive(Debug, Args)]
struct GetDataArgs {
    /// Where to write the data; a directory gets `sizes.json` appended.
    #[clap(long, value_name = "PATH", default_value = "./sizes.json")]
    destination: PathBuf,

    /// Overwrite an existing file.
    #[clap(long)]
    force: bool,

    /// Print the data to stdout instead of writing a file.
    #[clap(long)]
    print: bool,
}

impl From<GenerateArgs> for GenerateOptions {
    fn from(args: GenerateArgs) -> Self {
        let sources = [
            (SourceKey::Masked, args.masked_icon),
            (SourceKey::Monochrome, args.masked_monochrome_icon),
            (SourceKey::Dark, args.apple_darkmode_icon),
            (SourceKey::Tinted, args.apple_tinted_icon),
            (SourceKey::TileRectangle, args.tile_rect_image),
        ]
        .into_iter()
        .filter_map(|(key, path)| path.map(|path| (key, path)))
        .collect();

        Self {
            base_icon: args.base_icon,
            sources,
            prefix: args.prefix,
            destination: args.destination_dir,
            html_destination: args.html_destination,
            html_file_name: args.html_file_name,
            alternate_data: args.alternate_data,
            background_color: args.background_color,
            category_flags: args.categories.explicit(),
            no_icons: args.no_icons,
            outputs: OutputToggles {
                html: !args.no_html,
                manifest: !args.no_manifest,
            },
        }
    }
}

fn main() -> Result<()> {
    use tracing_subscriber::EnvFilter;
    let env = std::env::var("PWA_ICON_GEN_LOG").unwrap_or_else(|_| "warn".into());
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(env))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let cli = Cli::parse();
    match cli.command {
        Command::GenerateIcons(args) => generate::generate_icons(args.into()),
        Command::GetData(args) => generate::export_catalog(&args.destination, args.force, args.print),
    }
}
