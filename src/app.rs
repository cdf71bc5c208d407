//! Main application UI.
//! Routes between the create, study and analytics screens and turns user input
//! into repository and study-session operations.

use chrono::Utc;
use eframe::egui;
use flashmaster::AppState;
use flashmaster::analytics::LearningStats;
use flashmaster::export::json::export_cards_to_path;
use flashmaster::models::{ALL_TAGS, FilterChange, StudyView};
use std::time::{Duration, Instant};

const TOAST_DURATION: Duration = Duration::from_secs(3);

/// Application screen states
#[derive(Default, Clone, Copy, PartialEq, Eq)]
enum AppScreen {
    #[default]
    Create,
    Study,
    Analytics,
}

/// Study-screen input, applied after rendering to avoid borrowing conflicts.
enum StudyAction {
    Flip,
    Next,
    Previous,
    Shuffle,
    ToggleMastered,
    Filter(FilterChange),
    BackToStart,
    ResetSession,
    Navigate(AppScreen),
}

pub struct FlashmasterApp {
    state: AppState,
    current_screen: AppScreen,

    question_input: String,
    answer_input: String,
    tags_input: String,

    show_start_studying_dialog: bool,
    toast: Option<(String, Instant)>,
}

impl eframe::App for FlashmasterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        if self
            .state
            .session
            .poll_auto_advance(&self.state.repository, now)
        {
            log::debug!("Auto-advanced to card {}", self.state.session.cursor());
        }
        if let Some(due) = self.state.session.auto_advance_due() {
            ctx.request_repaint_after(due.saturating_duration_since(now));
        }

        egui::TopBottomPanel::top("navigation").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.current_screen, AppScreen::Create, "Create");
                ui.selectable_value(&mut self.current_screen, AppScreen::Study, "Study");
                ui.selectable_value(&mut self.current_screen, AppScreen::Analytics, "Analytics");
            });
        });

        self.render_toast(ctx, now);

        match self.current_screen {
            AppScreen::Create => self.render_create_screen(ctx),
            AppScreen::Study => self.render_study_screen(ctx),
            AppScreen::Analytics => self.render_analytics_screen(ctx),
        }

        if self.show_start_studying_dialog {
            egui::Window::new("Your first card is ready")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.label("Do you want to start studying now?");
                    ui.horizontal(|ui| {
                        if ui.button("Start studying").clicked() {
                            self.show_start_studying_dialog = false;
                            self.current_screen = AppScreen::Study;
                        }
                        if ui.button("Add more cards").clicked() {
                            self.show_start_studying_dialog = false;
                        }
                    });
                });
        }
    }
}

impl FlashmasterApp {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            current_screen: AppScreen::Create,
            question_input: String::new(),
            answer_input: String::new(),
            tags_input: String::new(),
            show_start_studying_dialog: false,
            toast: None,
        }
    }

    fn notify(&mut self, message: impl Into<String>) {
        self.toast = Some((message.into(), Instant::now()));
    }

    fn render_toast(&mut self, ctx: &egui::Context, now: Instant) {
        let Some((message, shown_at)) = &self.toast else {
            return;
        };

        let elapsed = now.saturating_duration_since(*shown_at);
        if elapsed >= TOAST_DURATION {
            self.toast = None;
            return;
        }

        egui::TopBottomPanel::bottom("toast").show(ctx, |ui| {
            ui.label(message.as_str());
        });
        ctx.request_repaint_after(TOAST_DURATION - elapsed);
    }

    /// Renders the card creation form and the card list
    fn render_create_screen(&mut self, ctx: &egui::Context) {
        let mut action_create = false;
        let mut action_export = false;

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Create New Card");

            ui.label("Question:");
            ui.text_edit_multiline(&mut self.question_input);
            ui.label("Answer:");
            ui.text_edit_multiline(&mut self.answer_input);
            ui.horizontal(|ui| {
                ui.label("Tags (comma separated):");
                ui.text_edit_singleline(&mut self.tags_input);
            });

            ui.horizontal(|ui| {
                if ui.button("Add Card").clicked() {
                    action_create = true;
                }
                if ui.button("Export Cards").clicked() {
                    action_export = true;
                }
            });

            ui.separator();

            let cards = self.state.repository.all();
            ui.heading(format!("Cards ({})", cards.len()));

            egui::ScrollArea::vertical()
                .id_source("cards_list")
                .show(ui, |ui| {
                    for (i, card) in cards.iter().enumerate() {
                        ui.group(|ui| {
                            let marker = if card.mastered { " ✔" } else { "" };
                            ui.label(format!("{}. {}{}", i + 1, card.question, marker));
                            ui.label(format!("   {}", card.answer));
                            if !card.tags.is_empty() {
                                ui.small(card.tags.join(", "));
                            }
                        });
                    }
                });
        });

        if action_create {
            self.handle_create();
        }
        if action_export {
            self.handle_export();
        }
    }

    fn handle_create(&mut self) {
        let tags: Vec<String> = self.tags_input.split(',').map(str::to_string).collect();

        match self
            .state
            .repository
            .create(&self.question_input, &self.answer_input, &tags)
        {
            Ok(created) => {
                self.question_input.clear();
                self.answer_input.clear();
                self.tags_input.clear();
                self.notify("Card created");
                if created.first_card {
                    self.show_start_studying_dialog = true;
                }
            }
            Err(e) => self.notify(e.to_string()),
        }
    }

    /// Handles card export to a JSON file chosen in a save dialog
    fn handle_export(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .set_file_name("flashmaster-cards.json")
            .add_filter("JSON files", &["json"])
            .save_file()
        else {
            return;
        };

        match export_cards_to_path(self.state.repository.all(), &path) {
            Ok(()) => self.notify(format!(
                "Exported {} cards to {}",
                self.state.repository.len(),
                path.display()
            )),
            Err(e) => {
                log::warn!("Export to '{}' failed: {}", path.display(), e);
                self.notify(format!("Export failed: {}", e));
            }
        }
    }

    /// Renders the study screen and applies the resulting action
    fn render_study_screen(&mut self, ctx: &egui::Context) {
        let mut actions: Vec<StudyAction> = Vec::new();

        // Shortcuts stay off while a text field has focus
        if !ctx.wants_keyboard_input() {
            let flipped = self.state.session.is_flipped();
            ctx.input(|i| {
                if i.key_pressed(egui::Key::Space) {
                    actions.push(StudyAction::Flip);
                }
                if i.key_pressed(egui::Key::ArrowLeft) {
                    actions.push(StudyAction::Previous);
                }
                if i.key_pressed(egui::Key::ArrowRight) {
                    actions.push(StudyAction::Next);
                }
                if i.key_pressed(egui::Key::M) && flipped {
                    actions.push(StudyAction::ToggleMastered);
                }
            });
        }

        let repo = &self.state.repository;
        let session = &self.state.session;

        egui::CentralPanel::default().show(ctx, |ui| match session.study_view(repo) {
            StudyView::NoCards => {
                ui.heading("No flashcards available");
                ui.label("Create some cards before studying.");
                ui.add_space(20.0);
                if ui.button("Create Cards").clicked() {
                    actions.push(StudyAction::Navigate(AppScreen::Create));
                }
            }
            StudyView::AllMastered => {
                ui.heading("All cards mastered!");
                ui.label("Every card matching this filter is marked as mastered.");
                ui.add_space(20.0);
                ui.horizontal(|ui| {
                    if ui.button("Include Mastered Cards").clicked() {
                        actions.push(StudyAction::Filter(FilterChange::ShowMastered(true)));
                    }
                    if session.selected_tag() != ALL_TAGS && ui.button("Show All Tags").clicked() {
                        actions.push(StudyAction::Filter(FilterChange::Tag(ALL_TAGS.to_string())));
                    }
                    if ui.button("Back").clicked() {
                        actions.push(StudyAction::Navigate(AppScreen::Create));
                    }
                });
            }
            view => {
                let mut selected_tag = session.selected_tag().to_string();
                let mut show_mastered = session.show_mastered();

                ui.horizontal(|ui| {
                    egui::ComboBox::from_label("Tag")
                        .selected_text(selected_tag.clone())
                        .show_ui(ui, |ui| {
                            ui.selectable_value(&mut selected_tag, ALL_TAGS.to_string(), ALL_TAGS);
                            for tag in repo.list_tags() {
                                ui.selectable_value(&mut selected_tag, tag.clone(), tag);
                            }
                        });
                    if ui.checkbox(&mut show_mastered, "Show mastered").changed() {
                        actions.push(StudyAction::Filter(FilterChange::ShowMastered(
                            show_mastered,
                        )));
                    }
                });
                if selected_tag != session.selected_tag() {
                    actions.push(StudyAction::Filter(FilterChange::Tag(selected_tag)));
                }

                let progress = session.progress(repo);
                ui.horizontal(|ui| {
                    ui.label(format!("Card {} of {}", progress.position, progress.total));
                    ui.label(format!("Mastered: {}", progress.mastered_in_view));
                    ui.label(format!("Reviewed: {}", progress.reviewed_this_session));
                    if ui.small_button("Reset session").clicked() {
                        actions.push(StudyAction::ResetSession);
                    }
                });
                if progress.total > 0 {
                    ui.add(egui::ProgressBar::new(
                        progress.mastered_in_view as f32 / progress.total as f32,
                    ));
                }

                ui.add_space(20.0);

                let StudyView::Card(card) = view else {
                    ui.label("No card at this position.");
                    if ui.button("Back to First Card").clicked() {
                        actions.push(StudyAction::BackToStart);
                    }
                    return;
                };

                ui.group(|ui| {
                    ui.set_min_height(200.0);
                    ui.vertical_centered(|ui| {
                        ui.add_space(20.0);
                        ui.heading("Question:");
                        ui.label(&card.question);
                        ui.add_space(20.0);

                        if session.is_flipped() {
                            ui.heading("Answer:");
                            ui.label(&card.answer);
                        } else {
                            ui.label("(Press space or 'Flip' to reveal)");
                        }

                        if !card.tags.is_empty() {
                            ui.add_space(10.0);
                            ui.small(card.tags.join(", "));
                        }
                        ui.add_space(20.0);
                    });
                });

                ui.add_space(10.0);
                ui.horizontal(|ui| {
                    if ui.button("◀ Previous").clicked() {
                        actions.push(StudyAction::Previous);
                    }
                    if ui.button("Flip").clicked() {
                        actions.push(StudyAction::Flip);
                    }
                    if ui.button("Next ▶").clicked() {
                        actions.push(StudyAction::Next);
                    }
                    if ui.button("Shuffle").clicked() {
                        actions.push(StudyAction::Shuffle);
                    }
                });

                let label = if card.mastered {
                    "Unmark Mastered (M)"
                } else {
                    "Mark Mastered (M)"
                };
                if ui
                    .add_enabled(session.is_flipped(), egui::Button::new(label))
                    .clicked()
                {
                    actions.push(StudyAction::ToggleMastered);
                }
            }
        });

        for action in actions {
            self.apply_study_action(action);
        }
    }

    fn apply_study_action(&mut self, action: StudyAction) {
        let state = &mut self.state;
        match action {
            StudyAction::Flip => state.session.flip(&state.repository),
            StudyAction::Next => state.session.next(&state.repository),
            StudyAction::Previous => state.session.previous(),
            StudyAction::Shuffle => state.session.shuffle(&state.repository),
            StudyAction::ToggleMastered => {
                if let Some(card) = state.session.toggle_mastered(&mut state.repository) {
                    let message = if card.mastered {
                        "Marked as mastered"
                    } else {
                        "Marked for review"
                    };
                    self.notify(message);
                }
            }
            StudyAction::Filter(change) => state.session.change_filter(change),
            StudyAction::BackToStart => state.session.clamp_cursor(&state.repository),
            StudyAction::ResetSession => state.session.reset_session(Utc::now()),
            StudyAction::Navigate(screen) => self.current_screen = screen,
        }
    }

    /// Renders the read-only learning statistics
    fn render_analytics_screen(&mut self, ctx: &egui::Context) {
        let stats = LearningStats::compute(self.state.repository.all(), Utc::now());

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Learning Analytics");
            ui.separator();

            egui::Grid::new("summary").num_columns(2).show(ui, |ui| {
                ui.label("Total cards");
                ui.label(stats.total_cards.to_string());
                ui.end_row();
                ui.label("Mastered");
                ui.label(format!(
                    "{} ({:.0}%)",
                    stats.mastered_cards, stats.completion_rate
                ));
                ui.end_row();
                ui.label("Reviewed cards");
                ui.label(stats.reviewed_cards.to_string());
                ui.end_row();
                ui.label("Total reviews");
                ui.label(stats.total_reviews.to_string());
                ui.end_row();
                ui.label("Average reviews");
                ui.label(format!("{:.1}", stats.average_reviews));
                ui.end_row();
                ui.label("Reviewed this week");
                ui.label(stats.recent_activity.to_string());
                ui.end_row();
            });

            let completion = (stats.completion_rate / 100.0) as f32;
            ui.add(egui::ProgressBar::new(completion).show_percentage());

            ui.separator();
            ui.heading("By Tag");
            if stats.tag_stats.is_empty() {
                ui.label("No tags yet.");
            } else {
                egui::Grid::new("tag_stats").striped(true).show(ui, |ui| {
                    ui.strong("Tag");
                    ui.strong("Cards");
                    ui.strong("Mastered");
                    ui.strong("Reviews");
                    ui.end_row();
                    for (tag, tag_stats) in &stats.tag_stats {
                        ui.label(tag);
                        ui.label(tag_stats.total.to_string());
                        ui.label(tag_stats.mastered.to_string());
                        ui.label(tag_stats.reviews.to_string());
                        ui.end_row();
                    }
                });
            }

            ui.separator();
            ui.heading("Most Studied");
            for (i, card) in stats.most_studied.iter().enumerate() {
                ui.label(format!(
                    "{}. {} ({} reviews)",
                    i + 1,
                    card.question,
                    card.review_count
                ));
            }

            let insights = stats.insights();
            if !insights.is_empty() {
                ui.separator();
                ui.heading("Insights");
                for insight in insights {
                    ui.label(insight.message());
                }
            }
        });
    }
}
