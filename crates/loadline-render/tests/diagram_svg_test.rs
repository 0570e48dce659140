use loadline_core::{
    Definitions, ManualPositions, PositionQuery, PreparedRoute, RouteKey, StopNames, Table,
    detect_period, diagram_title, prepare_route,
};
use loadline_render::{
    ColorBy, LayoutOptions, SvgRenderOptions, layout_route, model::DiagramLayout, render_svg,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

struct Fixture {
    route: PreparedRoute,
    names: StopNames,
    title: String,
}

fn inbound_with_positions() -> Fixture {
    let root = workspace_root().join("fixtures").join("patronage");
    let table = Table::read(&root.join("basic.csv")).expect("fixture");
    let bindings = Definitions::default().bind(&table).expect("bind");
    let positions = ManualPositions::read(&root.join("positions.csv")).expect("positions");
    let key = RouteKey::new("100", "Inbound");
    let route = prepare_route(
        &table,
        &bindings,
        &key,
        false,
        Some(PositionQuery {
            source: &positions,
            route: &key.route,
            direction_code: "0",
        }),
    )
    .expect("prepare")
    .expect("flows");
    let period = bindings.month.and_then(|c| detect_period(&table, c));
    Fixture {
        route,
        names: positions.names().clone(),
        title: diagram_title(&key.route, &key.direction, period),
    }
}

fn layout(fixture: &Fixture, options: &LayoutOptions) -> DiagramLayout {
    layout_route(
        &fixture.route,
        &fixture.names,
        Some(fixture.title.clone()),
        options,
        &mut StdRng::seed_from_u64(42),
    )
    .expect("layout")
}

#[test]
fn layout_sizes_the_canvas_from_stop_count_and_tier() {
    let fixture = inbound_with_positions();
    let layout = layout(&fixture, &LayoutOptions::default());

    assert_eq!(layout.stops.len(), 3);
    assert_eq!(layout.tier_max, 1);
    assert!(approx(layout.width, 100.0 + 2.0 * 125.0 + 100.0));
    assert!(approx(layout.axis_y, 3.0 * 0.5 * 125.0));
    assert!(approx(layout.height, 550.0 + layout.axis_y));
    assert!(approx(layout.width_scale, 8.0));

    let loads: Vec<i64> = layout.stops.iter().map(|s| s.load).collect();
    assert_eq!(loads, [6, 6, 0]);
    assert!(layout.stops[2].bar.is_none());
    assert_eq!(layout.stops[2].name, "Museum, North Entrance");
}

#[test]
fn arcs_never_overflow_their_origin_allotment() {
    let fixture = inbound_with_positions();
    let layout = layout(&fixture, &LayoutOptions::default());
    for stop in &layout.stops {
        let used: f64 = layout
            .arcs
            .iter()
            .filter(|a| a.origin == stop.id)
            .map(|a| a.width)
            .sum();
        assert!(used <= stop.allotment + 1e-9);
    }
    // The reversed 1002 -> 1001 flow is aggregated but not drawn.
    assert_eq!(layout.arcs.len(), 2);
}

#[test]
fn svg_contains_every_diagram_element() {
    let fixture = inbound_with_positions();
    let layout = layout(&fixture, &LayoutOptions::default());
    let svg = render_svg(&layout, &SvgRenderOptions::default()).expect("svg");
    let doc = roxmltree::Document::parse(&svg).expect("well-formed svg");

    let count = |tag: &str, class: &str| {
        doc.descendants()
            .filter(|n| n.has_tag_name(tag))
            .filter(|n| {
                n.attribute("class")
                    .is_some_and(|c| c.split_whitespace().any(|c| c == class))
            })
            .count()
    };

    assert!(doc.descendants().any(|n| n.attribute("id") == Some("bgrect")));
    assert!(doc.descendants().any(|n| n.attribute("id") == Some("mainline")));
    assert_eq!(count("path", "arc"), 2);
    assert_eq!(count("path", "f0"), 1);
    assert_eq!(count("line", "bargraph"), 2);
    assert_eq!(count("text", "bartxt"), 4);
    assert_eq!(count("circle", "markers"), 3);
    assert_eq!(count("text", "keyline"), 3 + 2);
    assert_eq!(count("text", "foreground"), 3 + 2);

    let title = doc
        .descendants()
        .find(|n| n.attribute("class") == Some("title"))
        .and_then(|n| n.text())
        .expect("title");
    assert_eq!(title, "100 Inbound \u{2013} March 2023");

    let tooltip = doc
        .descendants()
        .filter(|n| n.has_tag_name("title"))
        .filter_map(|n| n.text())
        .next()
        .expect("arc tooltip");
    assert_eq!(tooltip, "Central to Town Hall: 8 passengers");

    let style = doc
        .descendants()
        .find(|n| n.has_tag_name("style"))
        .and_then(|n| n.text())
        .expect("style");
    assert!(style.contains("#bgrect"));
    assert!(style.contains(".f2 {stroke:#"));
}

#[test]
fn user_css_replaces_defaults_and_destination_colouring_uses_t_rules() {
    let fixture = inbound_with_positions();
    let options = LayoutOptions {
        color_by: ColorBy::Destination,
        jumble_colors: true,
        ..LayoutOptions::default()
    };
    let layout = layout(&fixture, &options);
    let svg = render_svg(
        &layout,
        &SvgRenderOptions {
            css: Some(".arc {opacity: 1}".to_string()),
        },
    )
    .expect("svg");

    assert!(svg.contains(".arc {opacity: 1}"));
    assert!(!svg.contains("#bgrect {fill:white"));
    assert!(svg.contains(".t0 {stroke:#"));
    assert!(!svg.contains(".f0 {stroke:"));
    roxmltree::Document::parse(&svg).expect("well-formed svg");
}

#[test]
fn layout_serializes_to_json() {
    let fixture = inbound_with_positions();
    let layout = layout(&fixture, &LayoutOptions::default());
    let json = serde_json::to_value(&layout).expect("json");
    assert_eq!(json["route"], "100");
    assert_eq!(json["color_by"], "origin");
    assert_eq!(json["arcs"].as_array().map(Vec::len), Some(2));
}
