use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "distfield", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a coverage image (PNG/JPEG/SVG) into a distance-field PNG.
    Convert(ConvertArgs),
    /// Print what each capability tier negotiates to.
    Tiers,
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    /// Job file; flags given on the command line override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Input coverage image.
    #[arg(long = "in")]
    in_path: Option<PathBuf>,

    /// Output PNG path.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Output size as WxH.
    #[arg(long)]
    output_size: Option<String>,

    /// Search radius in source texels.
    #[arg(long)]
    radius: Option<u32>,

    /// Backend to use.
    #[arg(long, value_enum)]
    backend: Option<BackendChoice>,

    /// Which channel of a raster input holds coverage.
    #[arg(long, value_enum)]
    channel: Option<ChannelChoice>,

    /// Context the software device advertises.
    #[arg(long, value_enum)]
    emulate: Option<TierChoice>,

    /// Raster size for SVG input as WxH.
    #[arg(long)]
    svg_size: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendChoice {
    Software,
    Gpu,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ChannelChoice {
    Auto,
    Alpha,
    Red,
    Luma,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TierChoice {
    Gl320,
    Gl300,
    Gl210,
    Gles300,
    Gles200,
    Webgpu,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("DISTFIELD_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Convert(args) => cmd_convert(args),
        Command::Tiers => cmd_tiers(),
    }
}

fn backend_kind(choice: BackendChoice) -> distfield::BackendKind {
    match choice {
        BackendChoice::Software => distfield::BackendKind::Software,
        BackendChoice::Gpu => distfield::BackendKind::Gpu,
    }
}

fn coverage_channel(choice: ChannelChoice) -> distfield::CoverageChannel {
    match choice {
        ChannelChoice::Auto => distfield::CoverageChannel::Auto,
        ChannelChoice::Alpha => distfield::CoverageChannel::Alpha,
        ChannelChoice::Red => distfield::CoverageChannel::Red,
        ChannelChoice::Luma => distfield::CoverageChannel::Luma,
    }
}

fn capability_tier(choice: TierChoice) -> distfield::CapabilityTier {
    match choice {
        TierChoice::Gl320 => distfield::CapabilityTier::Gl320,
        TierChoice::Gl300 => distfield::CapabilityTier::Gl300,
        TierChoice::Gl210 => distfield::CapabilityTier::Gl210,
        TierChoice::Gles300 => distfield::CapabilityTier::Gles300,
        TierChoice::Gles200 => distfield::CapabilityTier::Gles200,
        TierChoice::Webgpu => distfield::CapabilityTier::WebGpu,
    }
}

fn resolve_config(args: ConvertArgs) -> anyhow::Result<distfield::ConvertConfig> {
    let output_size = args
        .output_size
        .as_deref()
        .map(distfield::config::parse_size)
        .transpose()?;
    let svg_size = args
        .svg_size
        .as_deref()
        .map(distfield::config::parse_size)
        .transpose()?;

    let mut cfg = match &args.config {
        Some(path) => distfield::ConvertConfig::from_json_file(path)?,
        None => distfield::ConvertConfig {
            input: args.in_path.clone().context("--in is required without --config")?,
            output: args.out.clone().context("--out is required without --config")?,
            output_size: output_size.context("--output-size is required without --config")?,
            radius: args.radius.context("--radius is required without --config")?,
            backend: distfield::BackendKind::Software,
            channel: distfield::CoverageChannel::Auto,
            emulate: None,
            svg_size: None,
        },
    };

    if let Some(input) = args.in_path {
        cfg.input = input;
    }
    if let Some(output) = args.out {
        cfg.output = output;
    }
    if let Some(size) = output_size {
        cfg.output_size = size;
    }
    if let Some(radius) = args.radius {
        cfg.radius = radius;
    }
    if let Some(backend) = args.backend {
        cfg.backend = backend_kind(backend);
    }
    if let Some(channel) = args.channel {
        cfg.channel = coverage_channel(channel);
    }
    if let Some(tier) = args.emulate {
        cfg.emulate = Some(capability_tier(tier));
    }
    if svg_size.is_some() {
        cfg.svg_size = svg_size;
    }
    Ok(cfg)
}

fn cmd_convert(args: ConvertArgs) -> anyhow::Result<()> {
    let cfg = resolve_config(args)?;
    cfg.validate()?;

    let coverage = distfield::CoverageImage::open(&cfg.input, cfg.channel, cfg.svg_size)?;
    let mut device = distfield::create_device(cfg.backend, &cfg.device_settings())?;
    let field = distfield::generate(device.as_mut(), &coverage, cfg.output_size, cfg.radius)
        .with_context(|| format!("transform '{}'", cfg.input.display()))?;

    field.save_png(&cfg.output)?;
    eprintln!("wrote {}", cfg.output.display());
    Ok(())
}

fn cmd_tiers() -> anyhow::Result<()> {
    for tier in distfield::CapabilityTier::ALL {
        let caps = distfield::negotiate(&tier.minimal_context())?;
        println!(
            "{tier}: language={:?} implicit_vertices={} explicit_attributes={} explicit_uniforms={} explicit_sampler={} texel_fetch={}",
            caps.shading_language(),
            caps.implicit_vertex_generation,
            caps.explicit_attribute_binding,
            caps.explicit_uniform_locations,
            caps.explicit_sampler_binding,
            caps.texel_fetch,
        );
    }
    Ok(())
}
