use anyhow::{Context, anyhow, bail};
use std::env;
use std::path::PathBuf;
use std::time::Instant;
use summoning_eru::showcase::config::load_config;
use summoning_eru::showcase::curved_text::{GlyphFont, layout_curved_text, render_curved_text};
use summoning_eru::showcase::CONFIG_PATH_DEFAULT;

#[derive(Debug)]
struct Args {
    config: PathBuf,
    font: Option<PathBuf>,
    text: Option<String>,
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = parse_args()?;
    let settings = load_config(&args.config).settings;
    let style = settings.curved_text_style()?;
    let font_path = args
        .font
        .unwrap_or_else(|| PathBuf::from(&settings.ground_text_font));
    let text = args.text.unwrap_or(settings.ground_text);

    let font = GlyphFont::load(&font_path, style.font_px)?;
    let layout = layout_curved_text(&text, style.text_arc(), &font, &style)?;
    println!(
        "\"{text}\": {} glyphs, arc {:.1}px over {:.2}°, radius {:.0}px",
        layout.glyphs.len(),
        layout.total_length,
        layout.total_angle.to_degrees(),
        layout.arc.radius
    );

    let start = Instant::now();
    let image = render_curved_text(&text, &font, &style)?;
    println!("Rendered in {:.1} ms", start.elapsed().as_secs_f64() * 1_000.0);

    image
        .save(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    println!("Written to {}", args.output.display());
    Ok(())
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        config: PathBuf::from(CONFIG_PATH_DEFAULT),
        font: None,
        text: None,
        output: PathBuf::from("ground_text.png"),
    };

    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = || {
            iter.next()
                .ok_or_else(|| anyhow!("{arg} expects a value"))
        };
        match arg.as_str() {
            "--config" => args.config = PathBuf::from(value()?),
            "--font" => args.font = Some(PathBuf::from(value()?)),
            "--text" => args.text = Some(value()?),
            "--output" | "-o" => args.output = PathBuf::from(value()?),
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => bail!("unknown argument: {arg}"),
        }
    }

    Ok(args)
}

fn print_help() {
    println!(
        "Usage:\n\
         cargo run --bin render_ground_text -- [options]\n\n\
         Options:\n\
         --config <path>   Scene config (default: config/scene.ron)\n\
         --font <path>     Font file, overrides the config\n\
         --text <text>     Text to render, overrides the config\n\
         -o, --output <p>  Output PNG (default: ground_text.png)"
    );
}
