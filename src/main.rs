use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{info, LevelFilter};

use ssd1306_gfx::config;
use ssd1306_gfx::display::{
    default_splash, Backing, Color, GfxDisplay, MemoryTransport, RamMedium,
};
use ssd1306_gfx::logging;

fn main() -> Result<()> {
    let level = std::env::var("GFX_LOG")
        .ok()
        .and_then(|level| logging::level_from_str(&level))
        .unwrap_or(LevelFilter::Info);
    logging::init(level).map_err(|e| anyhow::anyhow!("installing logger: {}", e))?;

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = config::load_or_default(config_path.as_deref())?;
    info!(
        "ssd1306-gfx demo {} - {}x{} panel, {}-byte cache lines",
        env!("CARGO_PKG_VERSION"),
        config.width,
        config.height,
        config.cache_line_size
    );

    // external RAM emulation: room for the draw buffer at its configured offset
    let medium = RamMedium::new(config.draw_offset + config.buffer_size());
    let medium_stats = medium.handle();
    let splash = default_splash(usize::from(config.width), usize::from(config.height));
    let mut display = GfxDisplay::new(
        MemoryTransport::new(),
        &config,
        Backing::External(Box::new(medium)),
        splash,
    )
    .context("initializing display")?;

    display.display_on()?;
    display.display().context("presenting splash")?;

    draw_scene(&mut display)?;
    display.display().context("presenting scene")?;
    display.flush()?;

    let stats = display.cache_stats();
    info!(
        "cache: {} hits, {} loads, {} flushes, {} source switches",
        stats.hits, stats.loads, stats.flushes, stats.source_switches
    );
    let io = medium_stats.stats();
    info!(
        "medium: {} reads ({} bytes), {} writes ({} bytes)",
        io.reads, io.bytes_read, io.writes, io.bytes_written
    );
    info!(
        "transport: {} bitmap bursts, {} bytes",
        display.transport().bitmap_burst_count(),
        display.transport().bitmap_bytes().len()
    );

    print_preview(&mut display)?;
    Ok(())
}

fn draw_scene(display: &mut GfxDisplay<MemoryTransport>) -> Result<()> {
    let (w, h) = (display.width(), display.height());

    display.draw_round_rect(0, 0, w, h, 6, Color::On)?;
    display.fill_circle(w - 20, h / 2, h / 4, Color::On)?;
    display.fill_triangle(8, h - 8, 24, h / 2, 40, h - 8, Color::On)?;
    display.draw_line(0, 0, w - 1, h - 1, Color::Invert)?;

    display.set_cursor(8, 8);
    display.set_text_color_bg(Color::On, Color::Off);
    write!(display, "SSD1306 {}x{}", w, h).context("rendering text")?;
    Ok(())
}

/// Dump the draw buffer as text, two rows per output line
fn print_preview(display: &mut GfxDisplay<MemoryTransport>) -> Result<()> {
    for y in (0..display.height()).step_by(2) {
        let mut line = String::with_capacity(display.width() as usize);
        for x in 0..display.width() {
            let top = display.read_pixel(x, y)?;
            let bottom = display.read_pixel(x, y + 1)?;
            line.push(match (top, bottom) {
                (true, true) => '█',
                (true, false) => '▀',
                (false, true) => '▄',
                (false, false) => ' ',
            });
        }
        println!("{}", line);
    }
    Ok(())
}
