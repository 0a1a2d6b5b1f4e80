//! UI panels for the application
//!
//! Sidebar with tabs, file picker and drag-and-drop handling.

use crate::app::state::{AppState, FileLoader, SidebarTab, format_number_with_commas};
use egui::{Color32, RichText, Ui};
use osm_canvas_lib::{Color, FilterState, Style, TagValues};

/// Values listed per active tag before the list is cut
const MAX_LISTED_VALUES: usize = 20;

/// Render the sidebar toggle button (overlaid on top-right of the canvas)
pub fn sidebar_toggle_button(ui: &mut Ui, state: &mut AppState) {
    let button_size = egui::vec2(40.0, 40.0);
    let margin = 10.0;

    let rect = ui.max_rect();
    let button_pos = rect.right_top() + egui::vec2(-button_size.x - margin, margin);
    let button_rect = egui::Rect::from_min_size(button_pos, button_size);

    let response = ui.allocate_rect(button_rect, egui::Sense::click());
    if response.clicked() {
        state.ui_settings.sidebar_open = !state.ui_settings.sidebar_open;
    }

    let bg_color = if response.hovered() {
        ui.visuals().widgets.hovered.bg_fill
    } else {
        ui.visuals().widgets.inactive.bg_fill
    };
    ui.painter().rect_filled(button_rect, 5.0, bg_color);

    let icon = if state.ui_settings.sidebar_open {
        "✕"
    } else {
        "☰"
    };
    ui.painter().text(
        button_rect.center(),
        egui::Align2::CENTER_CENTER,
        icon,
        egui::FontId::proportional(20.0),
        ui.visuals().text_color(),
    );
}

/// Render the main sidebar
pub fn render_sidebar(ctx: &egui::Context, state: &mut AppState) {
    if !state.ui_settings.sidebar_open {
        return;
    }

    egui::SidePanel::right("main_sidebar")
        .default_width(300.0)
        .min_width(260.0)
        .max_width(450.0)
        .resizable(true)
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                for (tab, label) in [
                    (SidebarTab::Data, "📂 Data"),
                    (SidebarTab::Style, "🎨 Style"),
                    (SidebarTab::Filters, "🏷 Filters"),
                ] {
                    ui.selectable_value(&mut state.ui_settings.active_tab, tab, label);
                }
            });

            ui.separator();

            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| match state.ui_settings.active_tab {
                    SidebarTab::Data => render_data_tab(ui, state),
                    SidebarTab::Style => render_style_tab(ui, state),
                    SidebarTab::Filters => render_filters_tab(ui, state),
                });
        });
}

/// Render the Data tab: file actions, load progress, statistics, errors and selection
fn render_data_tab(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui| {
        if ui.button("📂 Open JSON File...").clicked() {
            state.file_loader.show_picker = true;
        }
        if ui.button("🗑 Clear").clicked() {
            state.clear_data();
        }
    });

    ui.add_space(8.0);

    if state.file_loader.is_busy(&state.view) {
        ui.separator();
        ui.label(
            RichText::new(format!("⏳ {}...", state.view.load_phase()))
                .strong()
                .color(ui.visuals().warn_fg_color),
        );
        ui.add(egui::ProgressBar::new(FileLoader::progress(&state.view)).show_percentage());
        ui.add_space(8.0);
    }

    if let Some(path) = &state.file_loader.loaded_file {
        ui.label(
            RichText::new(format!(
                "📄 {}",
                path.file_name().unwrap_or_default().to_string_lossy()
            ))
            .small(),
        );
    }

    ui.separator();
    render_stats_section(ui, state);
    ui.add_space(8.0);
    ui.separator();

    if !state.file_loader.errors.is_empty() {
        ui.label(
            RichText::new(format!("⚠ Errors ({} files)", state.file_loader.errors.len()))
                .strong()
                .color(Color32::RED),
        );
        ui.add_space(4.0);

        egui::ScrollArea::vertical()
            .id_salt("errors_scroll")
            .max_height(100.0)
            .show(ui, |ui| {
                for (file, error) in &state.file_loader.errors {
                    ui.label(
                        RichText::new(format!(
                            "• {}: {}",
                            file.file_name().unwrap_or_default().to_string_lossy(),
                            error
                        ))
                        .small()
                        .color(Color32::RED),
                    );
                }
            });

        ui.add_space(4.0);
        if ui.button("Clear Errors").clicked() {
            state.file_loader.errors.clear();
        }

        ui.add_space(8.0);
        ui.separator();
    }

    render_selection_section(ui, state);
}

fn render_stats_section(ui: &mut Ui, state: &AppState) {
    ui.label(RichText::new("📊 Statistics").strong());
    ui.add_space(4.0);

    let stats = &state.stats;
    egui::Grid::new("stats_grid")
        .num_columns(2)
        .spacing([12.0, 4.0])
        .show(ui, |ui| {
            ui.label("Nodes:");
            ui.label(RichText::new(format_number_with_commas(stats.node_count)).strong());
            ui.end_row();

            ui.label("Ways:");
            ui.label(RichText::new(format_number_with_commas(stats.way_count)).strong());
            ui.end_row();

            ui.label("Tag keys:");
            ui.label(RichText::new(format_number_with_commas(stats.tag_count)).strong());
            ui.end_row();

            if let Some(extent) = stats.extent {
                ui.label("Extent:");
                ui.label(format!(
                    "{:.4}°, {:.4}° → {:.4}°, {:.4}°",
                    extent.min().y,
                    extent.min().x,
                    extent.max().y,
                    extent.max().x
                ))
                .on_hover_text("South-west to north-east corner as latitude, longitude");
                ui.end_row();
            }

            if state.view.draw_count() > 0 {
                ui.separator();
                ui.separator();
                ui.end_row();

                ui.label("Draw Time:");
                let time_color = if stats.last_draw_time_ms < 16.0 {
                    Color32::GREEN
                } else if stats.last_draw_time_ms < 50.0 {
                    Color32::YELLOW
                } else {
                    Color32::RED
                };
                ui.label(
                    RichText::new(format!("{:.1} ms", stats.last_draw_time_ms)).color(time_color),
                );
                ui.end_row();

                ui.label("Drawn:");
                ui.label(
                    RichText::new(format!(
                        "{} nodes, {} ways",
                        format_number_with_commas(stats.last_draw.nodes),
                        format_number_with_commas(stats.last_draw.ways)
                    ))
                    .strong(),
                );
                ui.end_row();

                ui.label("Frames:");
                ui.label(format!("{}", state.view.draw_count()));
                ui.end_row();
            }
        });
}

/// Id, kind and tags of the selected element as pretty JSON
fn render_selection_section(ui: &mut Ui, state: &AppState) {
    ui.label(RichText::new("🔎 Selection").strong());
    ui.add_space(4.0);

    match state.view.selected_element() {
        Some(element) => match serde_json::to_string_pretty(&element) {
            Ok(json) => {
                ui.label(RichText::new(json).monospace().small());
            }
            Err(e) => {
                ui.label(RichText::new(format!("Cannot display element: {}", e)).small());
            }
        },
        None => {
            ui.label(
                RichText::new("Click a node or way to inspect it")
                    .small()
                    .weak(),
            );
        }
    }
}

fn color_row(ui: &mut Ui, label: &str, color: Color) -> Option<Color> {
    ui.label(label);
    let mut rgb = [color.r, color.g, color.b];
    let changed = ui.color_edit_button_srgb(&mut rgb).changed();
    ui.end_row();
    changed.then(|| Color::rgb(rgb[0], rgb[1], rgb[2]))
}

/// Render the Style tab
fn render_style_tab(ui: &mut Ui, state: &mut AppState) {
    ui.label(RichText::new("🎨 Appearance").strong());
    ui.add_space(6.0);

    let style = state.view.style().clone();
    egui::Grid::new("appearance_grid")
        .num_columns(2)
        .spacing([12.0, 8.0])
        .show(ui, |ui| {
            ui.label("Node Size:");
            let mut node_size = style.node_size;
            if ui
                .add(
                    egui::Slider::new(&mut node_size, Style::MIN_NODE_SIZE..=Style::MAX_NODE_SIZE)
                        .suffix(" px")
                        .step_by(1.0),
                )
                .changed()
            {
                state.view.set_node_size(node_size);
            }
            ui.end_row();

            ui.label("Way Width:");
            let mut way_width = style.way_width;
            if ui
                .add(
                    egui::Slider::new(&mut way_width, Style::MIN_WAY_WIDTH..=Style::MAX_WAY_WIDTH)
                        .suffix(" px")
                        .step_by(1.0),
                )
                .changed()
            {
                state.view.set_way_width(way_width);
            }
            ui.end_row();

            if let Some(color) = color_row(ui, "Node Color:", style.node_color) {
                state.view.set_node_color(color);
            }
            if let Some(color) = color_row(ui, "Way Color:", style.way_color) {
                state.view.set_way_color(color);
            }

            ui.label("Labels:");
            let mut show_labels = style.show_labels;
            if ui.checkbox(&mut show_labels, "Show node names").changed() {
                state.view.set_show_labels(show_labels);
            }
            ui.end_row();
        });

    ui.add_space(12.0);
    ui.separator();
    ui.add_space(8.0);

    if ui.button("↺ Reset View").clicked() {
        state.view.reset_view();
    }
    ui.label(
        RichText::new("Restores the default style and clears all filters")
            .small()
            .weak(),
    );
}

/// A change requested from the Filters tab, applied once the tab has been drawn
enum FilterAction {
    Tag(String, bool),
    Value(String, String, bool),
    EnableAll,
    DisableAll,
}

/// Render the Filters tab
fn render_filters_tab(ui: &mut Ui, state: &mut AppState) {
    let mut actions = Vec::new();
    {
        let (catalog, filters) = state.view.tag_overview();
        if catalog.is_empty() {
            ui.label(RichText::new("No tags in the loaded data").small().weak());
            return;
        }

        ui.horizontal(|ui| {
            if ui.button("Enable All").clicked() {
                actions.push(FilterAction::EnableAll);
            }
            if ui.button("Disable All").clicked() {
                actions.push(FilterAction::DisableAll);
            }
        });
        ui.label(
            RichText::new("With no tag enabled everything is shown")
                .small()
                .weak(),
        );

        ui.add_space(8.0);
        ui.separator();

        for tag in catalog.tags() {
            let mut active = filters.is_tag_active(&tag.name);
            if ui
                .checkbox(&mut active, format!("{} ({})", tag.name, tag.count))
                .changed()
            {
                actions.push(FilterAction::Tag(tag.name.clone(), active));
            }

            if let Some(values) = catalog.cached_values(&tag.name)
                && filters.is_tag_active(&tag.name)
            {
                render_tag_values(ui, filters, &tag.name, values, &mut actions);
            }
        }
    }

    for action in actions {
        match action {
            FilterAction::Tag(tag, active) => state.view.set_tag_active(&tag, active),
            FilterAction::Value(tag, value, selected) => {
                state.view.set_tag_value_selected(&tag, &value, selected)
            }
            FilterAction::EnableAll => state.view.enable_all_dataset_filters(),
            FilterAction::DisableAll => state.view.disable_all_filters(),
        }
    }
}

/// Value checkboxes of one active tag, most common first
fn render_tag_values(
    ui: &mut Ui,
    filters: &FilterState,
    tag: &str,
    values: &TagValues,
    actions: &mut Vec<FilterAction>,
) {
    ui.indent(("tag_values", tag), |ui| {
        for value in values.top(MAX_LISTED_VALUES) {
            let mut selected = filters.is_value_selected(tag, &value.name);
            if ui
                .checkbox(&mut selected, format!("{} ({})", value.name, value.count))
                .changed()
            {
                actions.push(FilterAction::Value(tag.to_owned(), value.name.clone(), selected));
            }
        }
        if values.is_truncated(MAX_LISTED_VALUES) {
            ui.label(
                RichText::new(format!(
                    "Showing {} of {} values",
                    MAX_LISTED_VALUES,
                    values.values.len()
                ))
                .small()
                .weak(),
            );
        }
    });
}

/// Show file picker dialog
#[cfg(not(any(target_arch = "wasm32", target_os = "android")))]
pub fn show_file_picker(state: &mut AppState) {
    if state.file_loader.show_picker {
        state.file_loader.show_picker = false;

        if let Some(path) = rfd::FileDialog::new()
            .add_filter("OSM JSON", &["json"])
            .set_title("Select an OSM JSON File")
            .pick_file()
        {
            state.queue_file(path);
        }
    }
}

#[cfg(any(target_arch = "wasm32", target_os = "android"))]
pub fn show_file_picker(state: &mut AppState) {
    if state.file_loader.show_picker {
        state.file_loader.show_picker = false;
        tracing::warn!("File picker is not available on this platform, drop a file instead");
    }
}

/// Queue a dropped `.json` file and show a drop preview while hovering
pub fn handle_drag_and_drop(ctx: &egui::Context, state: &mut AppState) {
    // Only read input state inside ctx.input
    let hovered_files = ctx.input(|i| !i.raw.hovered_files.is_empty());
    let dropped_files: Vec<_> = ctx.input(|i| i.raw.dropped_files.clone());

    if hovered_files {
        let painter = ctx.layer_painter(egui::LayerId::new(
            egui::Order::Foreground,
            egui::Id::new("drop_preview"),
        ));
        let screen_rect = ctx.content_rect();
        let bg_rect = egui::Rect::from_center_size(screen_rect.center(), egui::vec2(380.0, 80.0));
        painter.rect_filled(bg_rect, 16.0, Color32::from_black_alpha(180));
        painter.text(
            screen_rect.center(),
            egui::Align2::CENTER_CENTER,
            "📂 Drop an OSM JSON file here",
            egui::FontId::proportional(28.0),
            Color32::WHITE,
        );
    }

    // The last dropped JSON file wins, only one dataset is shown at a time
    let dropped = dropped_files
        .into_iter()
        .filter_map(|file| file.path)
        .filter(|path| path.extension().is_some_and(|e| e.eq_ignore_ascii_case("json")))
        .next_back();
    if let Some(path) = dropped {
        state.queue_file(path);
    }
}
