//! Parse → generate → render, as one job.

use log::{info, warn};
use micropatterns_lang::{ExecState, Interrupt, Runtime, RuntimeError};

use crate::renderer::{DisplayListRenderer, RenderOptions, RenderStats};
use crate::surface::Surface;

#[derive(Debug, Clone, Default)]
pub struct RenderResult {
    pub success: bool,
    pub interrupted: bool,
    /// Empty on success.
    pub error_message: String,
    /// Host state as seen by the script.
    pub final_state: ExecState,
    pub stats: RenderStats,
    pub display_list_len: usize,
    pub runtime_errors: Vec<RuntimeError>,
}

impl RenderResult {
    fn failed(state: ExecState, message: impl Into<String>) -> Self {
        Self { final_state: state, error_message: message.into(), ..Self::default() }
    }
}

/// Run one full render job against `surface`.
///
/// `interrupt` is cleared first; a request made while the job runs stops it
/// at the next poll point and is reported through `interrupted`.
pub fn render_script<S: Surface + ?Sized>(
    source: &str,
    state: ExecState,
    surface: &mut S,
    options: RenderOptions,
    interrupt: &Interrupt,
) -> RenderResult {
    interrupt.clear();

    if source.trim().is_empty() {
        warn!("render job had empty script content");
        return RenderResult::failed(state, "Render job had empty script content.");
    }

    let script = match micropatterns_lang::compile(source) {
        Ok(script) => script,
        Err(errors) => {
            warn!("parse failed with {} error(s)", errors.len());
            let mut message = String::from("Parse failed:");
            for e in &errors {
                message.push('\n');
                message.push_str(&e.to_string());
            }
            return RenderResult::failed(state, message);
        }
    };

    let mut runtime = Runtime::new(&script, surface.width(), surface.height());
    runtime.set_exec_state(state);
    runtime.set_interrupt(interrupt.clone());
    let generated = runtime.generate_display_list();
    let mut result = RenderResult {
        final_state: runtime.exec_state(),
        display_list_len: runtime.display_list().len(),
        runtime_errors: runtime.errors().to_vec(),
        ..RenderResult::default()
    };
    if !generated {
        info!("display list generation interrupted");
        result.interrupted = true;
        result.error_message = "Display list generation interrupted.".into();
        return result;
    }

    let items = runtime.take_display_list();
    let mut renderer = DisplayListRenderer::new(surface.width(), surface.height(), options)
        .with_interrupt(interrupt.clone());
    let completed = renderer.render(&items, surface);
    result.stats = renderer.stats();
    if !completed {
        info!("rendering interrupted");
        result.interrupted = true;
        result.error_message = "Rendering process interrupted.".into();
        return result;
    }

    info!(
        "rendered {} of {} items ({} runtime errors)",
        result.stats.rendered,
        result.stats.total,
        result.runtime_errors.len(),
    );
    result.success = true;
    result
}
