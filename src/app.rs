use std::sync::mpsc;

use chrono::Local;
use eframe::egui;
use egui::{Color32, Pos2, Sense, Stroke, Vec2};

use crate::config::AppConfig;
use crate::error::Result;
use crate::history::HISTORY_CAPACITY;
use crate::probe::IcmpProber;
use crate::projector::{GridLine, PointCategory, RenderSnapshot, initial_snapshot};
use crate::sampler::SnapshotSink;
use crate::session::{Session, SessionConfig, SessionState, default_log_dir};

const MARGIN_LEFT: f32 = 10.0;
const X_STEP: f32 = 3.0;

const FAST_COLOR: Color32 = Color32::from_rgba_premultiplied(64, 192, 64, 220);
const SLOW_COLOR: Color32 = Color32::from_rgba_premultiplied(230, 64, 64, 220);
const FAILURE_COLOR: Color32 = Color32::BLACK;
const MINOR_GRID_COLOR: Color32 = Color32::from_rgba_premultiplied(32, 32, 180, 190);

/// Forwards snapshots to the UI thread and wakes it up.
pub struct RepaintSink {
    tx: mpsc::Sender<RenderSnapshot>,
    ctx: egui::Context,
}

impl SnapshotSink for RepaintSink {
    fn on_snapshot_ready(&self, snapshot: RenderSnapshot) {
        if self.tx.send(snapshot).is_ok() {
            self.ctx.request_repaint();
        }
    }
}

pub struct PingLoggerApp {
    config: AppConfig,
    target: String,
    session: Option<Session>,
    snapshots: Option<mpsc::Receiver<RenderSnapshot>>,
    latest: Option<RenderSnapshot>,
    grid: Vec<GridLine>,
    error: Option<String>,
}

impl PingLoggerApp {
    pub fn new() -> Self {
        let config = AppConfig::load();
        Self {
            target: config.target.clone(),
            grid: config.settings().projector.grid_lines(),
            config,
            session: None,
            snapshots: None,
            latest: None,
            error: None,
        }
    }

    fn start_monitoring(&mut self, ctx: &egui::Context) -> Result<()> {
        let log_dir = match &self.config.log_dir {
            Some(dir) => dir.clone(),
            None => default_log_dir()?,
        };
        let session_config = SessionConfig::new(&self.target, &log_dir, Local::now().naive_local())?;
        let (tx, rx) = mpsc::channel();
        let mut session = Session::new(session_config, self.config.settings());
        session.start(
            IcmpProber::new(),
            RepaintSink {
                tx,
                ctx: ctx.clone(),
            },
        )?;

        let config = session.config();
        self.latest = Some(initial_snapshot(config.destination_host(), config.log_file_path()));
        ctx.send_viewport_cmd(egui::ViewportCommand::Title(format!(
            "Ping {}, timeout {}",
            config.destination_host(),
            session.settings().timeout.as_millis()
        )));

        self.config.target = config.destination_host().to_string();
        if let Err(e) = self.config.save() {
            log::warn!("Failed to save config: {e}");
        }

        self.snapshots = Some(rx);
        self.session = Some(session);
        Ok(())
    }

    fn drain_snapshots(&mut self) {
        if let Some(rx) = &self.snapshots {
            while let Ok(snapshot) = rx.try_recv() {
                self.latest = Some(snapshot);
            }
        }
    }

    /// Picks up the error of a loop that ended on its own.
    fn check_session(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if self.error.is_none() && session.state() == SessionState::Stopped {
            if let Err(e) = session.stop() {
                log::error!("Monitoring stopped: {e}");
                self.error = Some(e.to_string());
            }
        }
    }

    fn draw_history(&self, ui: &mut egui::Ui, snapshot: &RenderSnapshot) {
        let extent = self.config.settings().projector.max_extent as f32;
        let width = MARGIN_LEFT * 2.0 + HISTORY_CAPACITY as f32 * X_STEP;
        let (rect, _) = ui.allocate_exact_size(Vec2::new(width, extent + 10.0), Sense::hover());
        let painter = ui.painter_at(rect);

        let base = rect.top() + extent;
        let x_left = rect.left() + MARGIN_LEFT;
        let x_right = x_left + HISTORY_CAPACITY as f32 * X_STEP;

        for line in &self.grid {
            let y = base - line.height as f32;
            let color = if line.major { Color32::BLACK } else { MINOR_GRID_COLOR };
            painter.line_segment([Pos2::new(x_left, y), Pos2::new(x_right, y)], Stroke::new(0.3, color));
            if line.major {
                painter.text(
                    Pos2::new(x_right, y),
                    egui::Align2::RIGHT_BOTTOM,
                    format!("{}ms", line.value_ms),
                    egui::FontId::proportional(10.0),
                    Color32::DARK_GRAY,
                );
            }
        }

        for (i, point) in snapshot.points.iter().enumerate() {
            let color = match point.category {
                PointCategory::NoData => continue,
                PointCategory::SuccessFast => FAST_COLOR,
                PointCategory::SuccessSlow => SLOW_COLOR,
                PointCategory::Failure => FAILURE_COLOR,
            };
            let x = x_left + i as f32 * X_STEP;
            let top = base - point.height as f32;
            painter.line_segment([Pos2::new(x, base), Pos2::new(x, top)], Stroke::new(X_STEP, color));
        }
    }
}

impl Default for PingLoggerApp {
    fn default() -> Self {
        Self::new()
    }
}

impl eframe::App for PingLoggerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_snapshots();
        self.check_session();

        egui::CentralPanel::default().show(ctx, |ui| {
            let started = self.session.is_some();

            ui.horizontal(|ui| {
                ui.label("Host:");
                ui.add_enabled(!started, egui::TextEdit::singleline(&mut self.target));
                if !started && ui.button("Run").clicked() {
                    if let Err(e) = self.start_monitoring(ctx) {
                        log::error!("Failed to start monitoring: {e}");
                        self.error = Some(e.to_string());
                    } else {
                        self.error = None;
                    }
                }
            });

            if let Some(error) = &self.error {
                ui.colored_label(Color32::RED, error);
            }

            ui.separator();

            if let Some(snapshot) = &self.latest {
                self.draw_history(ui, snapshot);
                ui.separator();
                ui.label(&snapshot.summary);
            }
        });
    }
}
