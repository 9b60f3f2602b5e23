mod config;

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use eframe::egui::{self, Color32, RichText};
use log::{error, info, warn};
use micropatterns_lang::{
    Command, CommandKind, DEFAULT_SCRIPT, DisplayListItem, Error, ExecState, Interrupt, Runtime, RuntimeError, Script,
    compile,
};
use micropatterns_renderer::{DisplayListRenderer, MonoCanvas, RenderOptions, RenderStats, Surface};

use crate::config::AppConfig;

fn mono_row(ui: &mut egui::Ui, label: &str, value: &str) {
    ui.horizontal(|ui| {
        ui.label(RichText::new(label).monospace().color(Color32::from_rgb(140, 140, 140)));
        ui.label(RichText::new(value).monospace().color(Color32::from_rgb(210, 210, 170)));
    });
}

fn main() -> eframe::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let config = AppConfig::load().unwrap_or_else(|e| {
        warn!("{e}; using defaults");
        AppConfig::default()
    });
    info!("surface {}×{}, occlusion block {}", config.width, config.height, config.block_size);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1400.0, 800.0]),
        ..Default::default()
    };
    eframe::run_native("MicroPatterns Dev", options, Box::new(|_cc| Ok(Box::new(App::new(config)))))
}

// ─── Host clock ───────────────────────────────────────────────────────────────

/// Wall-clock time of day, UTC.
fn clock_now() -> (i32, i32, i32) {
    let secs = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    let day = (secs % 86_400) as i32;
    (day / 3600, day / 60 % 60, day % 60)
}

// ─── App state ────────────────────────────────────────────────────────────────

#[derive(PartialEq)]
enum Tab { Errors, Commands, DisplayList, Canvas, Stats }

struct App {
    config: AppConfig,
    source: String,
    result: RunResult,
    tab: Tab,
    state: ExecState,
    use_clock: bool,
    fallback: bool,
    last_second: i32,
    texture: Option<egui::TextureHandle>,
    texture_stale: bool,
}

impl App {
    fn new(config: AppConfig) -> Self {
        let source = match config.initial_script() {
            Some(Ok(text)) => text,
            Some(Err(e)) => {
                error!("{e}");
                DEFAULT_SCRIPT.to_string()
            }
            None => DEFAULT_SCRIPT.to_string(),
        };
        let state = ExecState::default();
        let result = run(&source, state, &config, true);
        Self {
            config,
            source,
            result,
            tab: Tab::Canvas,
            state,
            use_clock: false,
            fallback: true,
            last_second: -1,
            texture: None,
            texture_stale: true,
        }
    }

    fn rerun(&mut self) {
        self.result = run(&self.source, self.state, &self.config, self.fallback);
        self.texture_stale = true;
    }
}

// ─── Run result ───────────────────────────────────────────────────────────────

struct RunResult {
    parse_errors: Vec<Error>,
    runtime_errors: Vec<RuntimeError>,
    /// Set when the editor text failed to parse and the built-in script ran.
    used_fallback: bool,
    script: Option<Script>,
    display_list: Vec<DisplayListItem>,
    stats: RenderStats,
    canvas: MonoCanvas,
    generate_time: Duration,
    render_time: Duration,
}

fn run(source: &str, state: ExecState, config: &AppConfig, fallback: bool) -> RunResult {
    let mut canvas = MonoCanvas::new(config.width, config.height);

    // ── Parse ─────────────────────────────────────────────────────────────────
    let (script, parse_errors, used_fallback) = match compile(source) {
        Ok(script) => (Some(script), vec![], false),
        Err(errs) if fallback => {
            warn!("script failed to parse ({} errors), running the built-in script", errs.len());
            (compile(DEFAULT_SCRIPT).ok(), errs, true)
        }
        Err(errs) => (None, errs, false),
    };

    let Some(script) = script else {
        return RunResult {
            parse_errors,
            runtime_errors: vec![],
            used_fallback,
            script: None,
            display_list: vec![],
            stats: RenderStats::default(),
            canvas,
            generate_time: Duration::ZERO,
            render_time: Duration::ZERO,
        };
    };

    // ── Generate ──────────────────────────────────────────────────────────────
    let interrupt = Interrupt::new();
    let started = Instant::now();
    let (display_list, runtime_errors) = {
        let mut runtime = Runtime::new(&script, config.width, config.height);
        runtime.set_exec_state(state);
        runtime.set_interrupt(interrupt.clone());
        runtime.generate_display_list();
        (runtime.take_display_list(), runtime.errors().to_vec())
    };
    let generate_time = started.elapsed();

    // ── Render ────────────────────────────────────────────────────────────────
    let options = RenderOptions { block_size: config.block_size, ..RenderOptions::default() };
    let started = Instant::now();
    let mut renderer = DisplayListRenderer::new(config.width, config.height, options).with_interrupt(interrupt);
    renderer.render(&display_list, &mut canvas);
    let render_time = started.elapsed();

    RunResult {
        parse_errors,
        runtime_errors,
        used_fallback,
        script: Some(script),
        display_list,
        stats: renderer.stats(),
        canvas,
        generate_time,
        render_time,
    }
}

fn canvas_image(canvas: &MonoCanvas) -> egui::ColorImage {
    let rgba: Vec<u8> = canvas
        .as_bytes()
        .iter()
        .flat_map(|&p| if p == 0 { [20, 20, 20, 255] } else { [235, 235, 225, 255] })
        .collect();
    let (w, h) = (canvas.width() as usize, canvas.height() as usize);
    egui::ColorImage::from_rgba_unmultiplied([w, h], &rgba)
}

// ─── UI ───────────────────────────────────────────────────────────────────────

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ── Follow the wall clock ─────────────────────────────────────────────
        if self.use_clock {
            let (hour, minute, second) = clock_now();
            if second != self.last_second {
                self.last_second = second;
                self.state = ExecState { hour, minute, second, ..self.state };
                self.rerun();
            }
            ctx.request_repaint_after(Duration::from_millis(200));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.columns(2, |cols| {
                // ── Left: editor ──────────────────────────────────────────────
                cols[0].vertical(|ui| {
                    ui.label("Script");
                    let response = ui.add(
                        egui::TextEdit::multiline(&mut self.source)
                            .font(egui::TextStyle::Monospace)
                            .desired_width(f32::INFINITY)
                            .desired_rows(44),
                    );
                    if response.changed() {
                        self.rerun();
                    }
                });

                // ── Right: output ─────────────────────────────────────────────
                cols[1].vertical(|ui| {
                    self.show_status(ui);
                    ui.separator();
                    self.show_host_inputs(ui);
                    ui.separator();

                    // ── Tab bar ───────────────────────────────────────────────
                    ui.horizontal(|ui| {
                        let n = self.result.parse_errors.len() + self.result.runtime_errors.len();
                        let err_label = if n == 0 { "Errors".into() } else { format!("Errors ({n})") };
                        ui.selectable_value(&mut self.tab, Tab::Errors, err_label);
                        ui.selectable_value(&mut self.tab, Tab::Commands, "Commands");
                        ui.selectable_value(&mut self.tab, Tab::DisplayList, "Display list");
                        ui.selectable_value(&mut self.tab, Tab::Canvas, "Canvas");
                        ui.selectable_value(&mut self.tab, Tab::Stats, "Stats");
                    });

                    ui.separator();

                    // ── Tab content ───────────────────────────────────────────
                    egui::ScrollArea::both().show(ui, |ui| {
                        match self.tab {
                            Tab::Errors      => self.show_errors(ui),
                            Tab::Commands    => self.show_commands(ui),
                            Tab::DisplayList => self.show_display_list(ui),
                            Tab::Canvas      => self.show_canvas(ui),
                            Tab::Stats       => self.show_stats(ui),
                        }
                    });
                });
            });
        });
    }
}

impl App {
    fn show_status(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let r = &self.result;
            if r.parse_errors.is_empty() {
                ui.label(RichText::new("✓  parsed").color(Color32::from_rgb(80, 200, 80)));
            } else {
                ui.label(
                    RichText::new(format!("✗  {} parse error(s)", r.parse_errors.len()))
                        .color(Color32::from_rgb(220, 80, 80)),
                );
            }
            if r.used_fallback {
                ui.label(RichText::new("showing built-in script").color(Color32::from_rgb(220, 180, 60)));
            }
            if !r.runtime_errors.is_empty() {
                ui.label(
                    RichText::new(format!("{} runtime error(s)", r.runtime_errors.len()))
                        .color(Color32::from_rgb(220, 180, 60)),
                );
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.checkbox(&mut self.fallback, "fallback on error").changed() {
                    self.rerun();
                }
                if ui.button("run").clicked() {
                    self.rerun();
                }
            });
        });
    }

    fn show_host_inputs(&mut self, ui: &mut egui::Ui) {
        let before = self.state;
        ui.horizontal(|ui| {
            ui.label("counter");
            ui.add(egui::DragValue::new(&mut self.state.counter));
            if ui.button("wake").clicked() {
                self.state.counter = self.state.counter.wrapping_add(1);
            }
            ui.separator();
            ui.add_enabled_ui(!self.use_clock, |ui| {
                ui.label("hour");
                ui.add(egui::DragValue::new(&mut self.state.hour).range(0..=23));
                ui.label("minute");
                ui.add(egui::DragValue::new(&mut self.state.minute).range(0..=59));
                ui.label("second");
                ui.add(egui::DragValue::new(&mut self.state.second).range(0..=59));
            });
            ui.checkbox(&mut self.use_clock, "use clock");
        });
        if self.state != before {
            self.rerun();
        }
    }

    fn show_errors(&self, ui: &mut egui::Ui) {
        let r = &self.result;
        if r.parse_errors.is_empty() && r.runtime_errors.is_empty() {
            ui.label(RichText::new("No errors.").color(Color32::GRAY));
            return;
        }
        for e in &r.parse_errors {
            ui.label(
                RichText::new(format!("[{}] {e}", e.code.as_str()))
                    .monospace()
                    .color(Color32::from_rgb(220, 80, 80)),
            );
        }
        for e in &r.runtime_errors {
            ui.label(
                RichText::new(format!("[{}] {e}", e.code.as_str()))
                    .monospace()
                    .color(Color32::from_rgb(220, 180, 60)),
            );
        }
    }

    fn show_commands(&self, ui: &mut egui::Ui) {
        let Some(script) = &self.result.script else {
            ui.label(RichText::new("No command tree (parse failed).").color(Color32::GRAY));
            return;
        };
        if !script.declared_variables.is_empty() {
            mono_row(ui, "vars:", &script.declared_variables.join(" "));
        }
        for asset in script.assets.iter() {
            mono_row(ui, "pattern:", &format!("{} {}×{}", asset.display_name, asset.width, asset.height));
        }
        ui.add_space(4.0);
        show_command_list(ui, &script.commands, "root");
    }

    fn show_display_list(&self, ui: &mut egui::Ui) {
        if self.result.display_list.is_empty() {
            ui.label(RichText::new("Display list is empty.").color(Color32::GRAY));
            return;
        }
        for (i, item) in self.result.display_list.iter().enumerate() {
            ui.horizontal(|ui| {
                ui.label(RichText::new(format!("[{i}]")).monospace().color(Color32::GRAY));
                ui.label(RichText::new(item.op.name()).strong());
                ui.label(RichText::new(format!("line {}", item.line)).monospace().color(Color32::GRAY));
                if item.is_opaque {
                    ui.label(RichText::new("opaque").monospace().color(Color32::from_rgb(120, 180, 255)));
                }
            });
            let params: Vec<String> = item.int_params.iter().map(|(k, v)| format!("{k}={v}")).collect();
            mono_row(ui, "  params:", &params.join(" "));
            if let Some(asset) = &item.asset {
                mono_row(ui, "  asset: ", &asset.display_name);
            }
            let m = &item.matrix;
            mono_row(ui, "  matrix:", &format!(
                "[{:.3} {:.3} {:.3} {:.3} {:.1} {:.1}]  scale={}",
                m[0], m[1], m[2], m[3], m[4], m[5], item.scale
            ));
            let fill = item.fill.as_ref().map_or("SOLID", |f| f.display_name.as_str());
            mono_row(ui, "  paint: ", &format!("{} / {fill}", item.color));
            ui.add_space(6.0);
        }
    }

    fn show_canvas(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("zoom");
            ui.add(egui::Slider::new(&mut self.config.zoom, 1.0..=16.0).step_by(1.0));
        });
        if self.texture_stale || self.texture.is_none() {
            let image = canvas_image(&self.result.canvas);
            self.texture = Some(ui.ctx().load_texture("canvas", image, egui::TextureOptions::NEAREST));
            self.texture_stale = false;
        }
        let Some(texture) = &self.texture else { return };
        let size = egui::vec2(self.config.width as f32, self.config.height as f32) * self.config.zoom;
        ui.image((texture.id(), size));
    }

    fn show_stats(&self, ui: &mut egui::Ui) {
        let r = &self.result;
        let s = &r.stats;
        mono_row(ui, "surface:         ", &format!("{}×{}", self.config.width, self.config.height));
        mono_row(ui, "items:           ", &s.total.to_string());
        mono_row(ui, "rendered:        ", &s.rendered.to_string());
        mono_row(ui, "off-screen:      ", &s.culled_off_screen.to_string());
        mono_row(ui, "occluded:        ", &s.culled_by_occlusion.to_string());
        mono_row(ui, "generate:        ", &format!("{:.2?}", r.generate_time));
        mono_row(ui, "render:          ", &format!("{:.2?}", r.render_time));
        let st = self.state;
        mono_row(ui, "state:           ", &format!(
            "counter={} time={:02}:{:02}:{:02}", st.counter, st.hour, st.minute, st.second
        ));
    }
}

fn show_command_list(ui: &mut egui::Ui, commands: &[Command], id: &str) {
    for (i, cmd) in commands.iter().enumerate() {
        let label = format!("{:>4}  {}", cmd.line, cmd.kind.summary());
        match &cmd.kind {
            CommandKind::Repeat { body, .. } => {
                egui::CollapsingHeader::new(RichText::new(label).monospace())
                    .id_salt(format!("{id}/{i}"))
                    .default_open(true)
                    .show(ui, |ui| show_command_list(ui, body, &format!("{id}/{i}")));
            }
            CommandKind::If { then_branch, else_branch, .. } => {
                egui::CollapsingHeader::new(RichText::new(label).monospace())
                    .id_salt(format!("{id}/{i}"))
                    .default_open(true)
                    .show(ui, |ui| {
                        show_command_list(ui, then_branch, &format!("{id}/{i}/then"));
                        if !else_branch.is_empty() {
                            ui.label(RichText::new("ELSE").monospace().color(Color32::GRAY));
                            show_command_list(ui, else_branch, &format!("{id}/{i}/else"));
                        }
                    });
            }
            _ => {
                ui.label(RichText::new(label).monospace());
            }
        }
    }
}
