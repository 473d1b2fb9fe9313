use eframe::egui;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use injector_core::{
    default_output_path, discover, inspect, run as run_injector, Game, InjectorSettings, Ticket,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GuiConfig {
    resources_path: String,
    output_dir: String,
    game: Game,
    ticket: Ticket,
}

impl Default for GuiConfig {
    fn default() -> Self {
        Self {
            resources_path: default_resources_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            output_dir: String::new(),
            game: Game::Emerald,
            ticket: Ticket::EonTicket,
        }
    }
}

/// `resources/` next to the executable, if it exists.
fn default_resources_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let dir = exe.parent()?.join("resources");
    dir.is_dir().then_some(dir)
}

fn config_path() -> Option<PathBuf> {
    let mut base = dirs::config_dir().or_else(dirs::data_dir)?;
    base.push("TicketInjector");
    base.push("gui_config.json");
    Some(base)
}

fn load_config() -> GuiConfig {
    if let Some(path) = config_path() {
        if let Ok(data) = fs::read_to_string(&path) {
            if let Ok(cfg) = serde_json::from_str::<GuiConfig>(&data) {
                return cfg;
            }
        }
    }
    GuiConfig::default()
}

fn save_config(cfg: &GuiConfig) {
    if let Some(path) = config_path() {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Ok(data) = serde_json::to_string_pretty(cfg) {
            let _ = fs::write(path, data);
        }
    }
}

struct InjectorApp {
    game: Game,
    ticket: Ticket,
    save_path: String,
    resources_path: String,
    output_dir: String,
    backup: bool,

    installed: Vec<(Game, Ticket)>,

    is_running: bool,
    log: String,
    result_rx: Option<mpsc::Receiver<String>>,
}

impl Default for InjectorApp {
    fn default() -> Self {
        let cfg = load_config();
        let mut app = Self {
            game: cfg.game,
            ticket: cfg.ticket,
            save_path: String::new(),
            resources_path: cfg.resources_path,
            output_dir: cfg.output_dir,
            backup: true,
            installed: Vec::new(),
            is_running: false,
            log: String::new(),
            result_rx: None,
        };
        app.ensure_ticket_matches_game();
        app.refresh_installed();
        app
    }
}

impl InjectorApp {
    fn push_log(&mut self, line: impl AsRef<str>) {
        if !self.log.is_empty() {
            self.log.push('\n');
        }
        self.log.push_str(line.as_ref());
    }

    fn ensure_ticket_matches_game(&mut self) {
        if !self.ticket.available_for(self.game) {
            if let Some(first) = self.game.tickets().first() {
                self.ticket = *first;
            }
        }
    }

    fn refresh_installed(&mut self) {
        let root = self.resources_path.trim();
        self.installed = if root.is_empty() {
            Vec::new()
        } else {
            discover(Path::new(root))
        };
    }

    /// Reads a freshly chosen save and selects the game it was made with.
    fn load_save(&mut self, path: PathBuf) {
        self.save_path = path.display().to_string();

        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) => {
                self.push_log(format!("Could not read {}: {e}", path.display()));
                return;
            }
        };

        match inspect(&bytes, None) {
            Ok(report) => {
                self.push_log(format!(
                    "Loaded {} ({}, {} active)",
                    path.display(),
                    report.family,
                    report.active_slot
                ));
                match report.family.game() {
                    Some(game) => {
                        self.game = game;
                        self.ensure_ticket_matches_game();
                    }
                    None => self.push_log(format!("{} saves cannot receive tickets.", report.family)),
                }
            }
            Err(e) => self.push_log(format!("{}: {e}", path.display())),
        }
    }

    fn output_path(&self) -> Option<PathBuf> {
        let dir = self.output_dir.trim();
        if dir.is_empty() {
            return None;
        }
        let save = PathBuf::from(self.save_path.trim());
        let name = default_output_path(&save, self.ticket).file_name()?.to_os_string();
        Some(Path::new(dir).join(name))
    }

    fn start_injection(&mut self) {
        save_config(&GuiConfig {
            resources_path: self.resources_path.clone(),
            output_dir: self.output_dir.clone(),
            game: self.game,
            ticket: self.ticket,
        });

        let settings = InjectorSettings {
            game: self.game,
            ticket: self.ticket,
            save_path: PathBuf::from(self.save_path.trim()),
            output_path: self.output_path(),
            resources_path: PathBuf::from(self.resources_path.trim()),
            backup: self.backup,
        };

        let (tx, rx) = mpsc::channel();
        self.result_rx = Some(rx);
        self.is_running = true;
        self.push_log(format!("Injecting {} for {}...", self.ticket, self.game));

        thread::spawn(move || {
            let message = match run_injector(settings) {
                Ok(path) => format!("Done. Wrote {}", path.display()),
                Err(e) => format!("Error: {e}"),
            };
            let _ = tx.send(message);
        });
    }
}

impl eframe::App for InjectorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let finished = self
            .result_rx
            .as_ref()
            .and_then(|rx| rx.try_recv().ok());
        if let Some(msg) = finished {
            self.push_log(msg);
            self.is_running = false;
            self.result_rx = None;
        }

        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });
        if let Some(path) = dropped.into_iter().next() {
            self.load_save(path);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Ticket Injector");
            ui.label("Drop a .sav file onto this window, or browse for one.");
            ui.separator();

            ui.horizontal(|ui| {
                ui.label("Save file:");
                ui.text_edit_singleline(&mut self.save_path);
                if ui.button("Browse...").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Save file", &["sav", "srm", "fla"])
                        .pick_file()
                    {
                        self.load_save(path);
                    }
                }
            });

            ui.horizontal(|ui| {
                ui.label("Resources:");
                if ui.text_edit_singleline(&mut self.resources_path).lost_focus() {
                    self.refresh_installed();
                }
                if ui.button("Browse...").clicked() {
                    let mut dialog = rfd::FileDialog::new();
                    if !self.resources_path.trim().is_empty() {
                        dialog = dialog.set_directory(self.resources_path.trim());
                    }
                    if let Some(path) = dialog.pick_folder() {
                        self.resources_path = path.display().to_string();
                        self.refresh_installed();
                    }
                }
            });

            ui.horizontal(|ui| {
                ui.label("Output folder:");
                ui.text_edit_singleline(&mut self.output_dir);
                if ui.button("Browse...").clicked() {
                    if let Some(path) = rfd::FileDialog::new().pick_folder() {
                        self.output_dir = path.display().to_string();
                    }
                }
            });
            ui.small("Leave the output folder empty to write next to the save.");

            ui.separator();

            ui.horizontal(|ui| {
                ui.label("Game:");
                for game in Game::ALL {
                    if ui.radio_value(&mut self.game, game, game.display_name()).changed() {
                        self.ensure_ticket_matches_game();
                    }
                }
            });

            egui::ComboBox::from_label("Ticket")
                .selected_text(self.ticket.display_name())
                .show_ui(ui, |ui| {
                    for ticket in self.game.tickets() {
                        let label = if self.installed.contains(&(self.game, ticket)) {
                            ticket.display_name().to_string()
                        } else {
                            format!("{} (not installed)", ticket.display_name())
                        };
                        ui.selectable_value(&mut self.ticket, ticket, label);
                    }
                });

            ui.checkbox(&mut self.backup, "Keep a backup of the original save (.bak)");

            ui.separator();

            let can_run = !self.is_running && !self.save_path.trim().is_empty();
            if ui
                .add_enabled(can_run, egui::Button::new("Inject ticket"))
                .clicked()
            {
                self.start_injection();
            }

            ui.separator();
            ui.label("Log:");
            egui::ScrollArea::vertical()
                .id_source("log_scroll")
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    ui.monospace(&self.log);
                });
        });

        if self.is_running {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

fn main() -> eframe::Result<()> {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "injector_core=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([560.0, 480.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };
    eframe::run_native(
        "Ticket Injector",
        native_options,
        Box::new(|cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
            Box::new(InjectorApp::default())
        }),
    )
}
