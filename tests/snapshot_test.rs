use mindmap_rs::app::AppState;
use mindmap_rs::config::AppConfig;
use mindmap_rs::parser;
use mindmap_rs::ui::status_line::StatusLineRenderer;
use mindmap_rs::{EngineConfig, LayoutStrategy, MindMapController, NullAdapter, Size};
use insta::assert_snapshot;

mod common;
use common::*;

fn layout_listing(controller: &MindMapController<NullAdapter>) -> String {
    let layout = controller.visible_layout();
    controller
        .map()
        .ids()
        .iter()
        .filter_map(|id| {
            layout
                .get(id)
                .map(|p| format!("{} {:.0},{:.0} d{}", id, p.x, p.y, p.depth))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn solar_controller() -> MindMapController<NullAdapter> {
    let mut controller =
        MindMapController::new(EngineConfig::default(), Size::new(800.0, 600.0), NullAdapter);
    controller.load_payload(&solar_payload()).unwrap();
    controller
}

#[test]
fn test_outline_export() {
    let outline = parser::to_outline(&solar_map()).replace('\t', "  ");
    assert_snapshot!(outline.trim_end(), @r"
Solar System
  Inner Planets
    Mercury
    Venus
    Earth
      Moon
    Mars
  Outer Planets
    Jupiter
    Saturn
  Sun
");
}

#[test]
fn test_radial_first_ring() {
    let controller = solar_controller();
    assert_snapshot!(layout_listing(&controller), @r"
root 400,300 d0
inner 325,170 d1
outer 550,300 d1
sun 325,430 d1
");
}

#[test]
fn test_vertical_layout_fully_expanded() {
    let mut controller = solar_controller();
    controller.set_layout_strategy(LayoutStrategy::Vertical);
    controller.expand_all();
    assert_snapshot!(layout_listing(&controller), @r"
root 200,300 d0
inner 440,220 d1
mercury 640,40 d2
venus 640,160 d2
earth 640,280 d2
moon 840,280 d3
mars 640,400 d2
outer 440,300 d1
jupiter 640,240 d2
saturn 640,360 d2
sun 440,380 d1
");
}

#[test]
fn test_status_line_progression() {
    let mut app = AppState::new(AppConfig::default());
    app.load_map(solar_map(), None);
    let mut lines = Vec::new();
    let mut record = |app: &AppState| {
        lines.push(StatusLineRenderer::content_and_style(app, 80).0);
    };

    record(&app);
    app.controller.select(Some("inner"));
    record(&app);
    app.controller.expand_all();
    app.controller.zoom_in();
    record(&app);
    app.controller.set_layout_strategy(LayoutStrategy::Vertical);
    app.is_dirty = true;
    record(&app);

    assert_snapshot!(lines.join("\n"), @r"
Solar System | 4/11 nodes | Radial | 100%
Solar System | 4/11 nodes | Radial | 100% | Inner Planets
Solar System | 11/11 nodes | Radial | 110% | Inner Planets
Solar System | 11/11 nodes | Vertical | 110% | Inner Planets *
");
}
