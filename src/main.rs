//! Host-side helper.
//!
//! `cargo run -- serve` builds the WASM site into `static/pkg` and serves
//! `static/` on port 8000. `cargo run -- render --out poster.png` exports a
//! poster through the CPU renderer, which is handy for checking settings
//! files and export output without a browser.

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("serve") => host::serve(),
        Some("render") => host::render(&args[1..]),
        _ => {
            eprintln!("usage: poster_wasm serve");
            eprintln!(
                "       poster_wasm render --out FILE [--settings FILE] [--size WxH] \
                 [--scale N] [--blur PX] [--time T]"
            );
            std::process::exit(2);
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
mod host {
    use std::path::PathBuf;
    use std::process::{Command, Stdio};

    use anyhow::{anyhow, bail, Context};

    use poster_wasm::export::{self, CaptureRequest, DEFAULT_SCALE_FACTOR};
    use poster_wasm::gradient::GradientProgram;
    use poster_wasm::{PosterSettings, SoftwareSurface};

    pub fn serve() -> anyhow::Result<()> {
        log::info!("building WASM pkg");
        match Command::new("wasm-pack")
            .args([
                "build",
                "--release",
                "--target",
                "web",
                "--out-dir",
                "static/pkg",
            ])
            .status()
        {
            Ok(st) if st.success() => {}
            Ok(_) => bail!(
                "wasm-pack finished with errors. Ensure wasm-pack is installed \
                 (https://rustwasm.github.io/wasm-pack/)."
            ),
            Err(_) => log::warn!(
                "wasm-pack not found in PATH. Skipping wasm build; the site may serve stale artifacts."
            ),
        }

        log::info!("launching local server at http://127.0.0.1:8000");
        let status = Command::new("python3")
            .args(["-m", "http.server", "8000", "--directory", "static"])
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .status()
            .context("failed to start http server")?;
        if !status.success() {
            bail!("http server exited with {status}");
        }
        Ok(())
    }

    struct RenderArgs {
        out: PathBuf,
        settings: Option<PathBuf>,
        size: (u32, u32),
        scale: f64,
        blur: Option<f64>,
        time: f32,
    }

    fn parse_size(s: &str) -> anyhow::Result<(u32, u32)> {
        let (w, h) = s
            .split_once('x')
            .ok_or_else(|| anyhow!("size must look like 800x600, got {s:?}"))?;
        Ok((w.parse()?, h.parse()?))
    }

    fn parse_render_args(args: &[String]) -> anyhow::Result<RenderArgs> {
        let mut out = None;
        let mut parsed = RenderArgs {
            out: PathBuf::new(),
            settings: None,
            size: (800, 1000),
            scale: DEFAULT_SCALE_FACTOR,
            blur: None,
            time: 0.0,
        };
        let mut iter = args.iter();
        while let Some(flag) = iter.next() {
            let value = iter
                .next()
                .ok_or_else(|| anyhow!("missing value for {flag}"))?;
            match flag.as_str() {
                "--out" => out = Some(PathBuf::from(value)),
                "--settings" => parsed.settings = Some(PathBuf::from(value)),
                "--size" => parsed.size = parse_size(value)?,
                "--scale" => parsed.scale = value.parse().context("--scale")?,
                "--blur" => parsed.blur = Some(value.parse().context("--blur")?),
                "--time" => parsed.time = value.parse().context("--time")?,
                other => bail!("unknown option {other}"),
            }
        }
        parsed.out = out.ok_or_else(|| anyhow!("--out is required"))?;
        Ok(parsed)
    }

    pub fn render(args: &[String]) -> anyhow::Result<()> {
        let args = parse_render_args(args)?;
        let settings = match &args.settings {
            Some(path) => PosterSettings::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => PosterSettings::default(),
        };

        let (w, h) = args.size;
        let mut surface = SoftwareSurface::with_program(w, h, GradientProgram::from(&settings));
        surface.set_time(args.time);

        let mut request: CaptureRequest = settings.capture_request(args.scale);
        if let Some(blur) = args.blur {
            request.blur_radius_px = blur;
        }
        let image = export::export_png(&mut surface, &request)?;
        std::fs::write(&args.out, &image.png)
            .with_context(|| format!("writing {}", args.out.display()))?;
        log::info!(
            "wrote {} ({}x{}) for {:?}",
            args.out.display(),
            image.width,
            image.height,
            settings.title
        );
        Ok(())
    }
}
