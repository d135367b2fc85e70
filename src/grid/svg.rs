use tracing::warn;

use crate::season_map::SeasonMap;
use crate::store::Show;

use super::{
    BOX_HEIGHT, DIVIDER_STROKE_WIDTH, INNER_WIDTH, INTER_SEGMENT_SPACING, LABEL_WIDTH,
    OUTER_STROKE_WIDTH, SPECIAL_MARKER, SeasonScene, SlotLabel, season_scene,
};

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const ROW_GAP: f64 = BOX_HEIGHT / 3.0;
const SEEN_FILL: &str = "#ccc";
const UNSEEN_FILL: &str = "#fff";

pub(crate) fn season_svg(scene: &SeasonScene) -> String {
    // the right-hand outer stroke is centred past the last segment's end
    let width = scene.width + OUTER_STROKE_WIDTH;
    let mut out = String::new();
    out.push_str(&format!(
        r#"<svg xmlns="{SVG_NS}" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = num(width),
        h = num(scene.height),
    ));
    write_season_body(&mut out, scene);
    out.push_str("</svg>\n");
    out
}

/// Every decodable season of a show, stacked top to bottom.
pub(crate) fn show_document(show: &Show) -> String {
    let mut scenes = Vec::with_capacity(show.season_maps.len());
    for (idx, raw) in show.season_maps.iter().enumerate() {
        let season_map = match raw.parse::<SeasonMap>() {
            Ok(season_map) => season_map,
            Err(err) => {
                warn!(
                    show = show.id,
                    season = idx + 1,
                    error = %err,
                    "skipping undecodable season"
                );
                continue;
            }
        };
        let watch_map = show
            .watched_episode_maps
            .get(idx)
            .map(String::as_str)
            .unwrap_or("");
        scenes.push(season_scene(idx + 1, &season_map, watch_map));
    }

    let width = scenes
        .iter()
        .map(|scene| scene.width + OUTER_STROKE_WIDTH)
        .fold(LABEL_WIDTH, f64::max);
    let height = if scenes.is_empty() {
        0.0
    } else {
        scenes.len() as f64 * (BOX_HEIGHT + ROW_GAP) - ROW_GAP
    };

    let mut out = String::new();
    out.push_str(&format!(
        r#"<svg xmlns="{SVG_NS}" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = num(width),
        h = num(height),
    ));
    out.push_str(&format!("<title>{}</title>", escape(&show.title)));
    for (row, scene) in scenes.iter().enumerate() {
        let y = row as f64 * (BOX_HEIGHT + ROW_GAP);
        out.push_str(&format!(
            r#"<g data-season="{}" transform="translate(0 {})">"#,
            scene.season_number,
            num(y)
        ));
        write_season_body(&mut out, scene);
        out.push_str("</g>");
    }
    out.push_str("</svg>\n");
    out
}

fn write_season_body(out: &mut String, scene: &SeasonScene) {
    out.push_str(&format!(
        r##"<text x="{}" y="{}" dominant-baseline="middle" text-anchor="middle" style="font-size: {}px; font-weight: bold;" fill="#888">{}</text>"##,
        num(LABEL_WIDTH / 2.0),
        num(BOX_HEIGHT / 2.0),
        num(BOX_HEIGHT * 0.6),
        scene.season_number
    ));

    for center in &scene.separators {
        write_separator(out, *center);
    }

    for outline in &scene.outlines {
        let interior_x = outline.x_start + OUTER_STROKE_WIDTH;
        let interior_width = outline.x_end - interior_x;
        write_rect(
            out,
            interior_x,
            OUTER_STROKE_WIDTH,
            interior_width,
            INNER_WIDTH,
            0.0,
            Some(UNSEEN_FILL),
            None,
        );
    }

    for slot_box in &scene.boxes {
        if slot_box.seen {
            write_rect(
                out,
                slot_box.x,
                OUTER_STROKE_WIDTH,
                slot_box.width,
                INNER_WIDTH,
                0.0,
                Some(SEEN_FILL),
                None,
            );
        }
        if !slot_box.first_in_segment {
            let x = slot_box.x - DIVIDER_STROKE_WIDTH / 2.0;
            write_line(
                out,
                x,
                0.0,
                x,
                BOX_HEIGHT - OUTER_STROKE_WIDTH / 2.0,
                DIVIDER_STROKE_WIDTH,
            );
        }
        let label = match slot_box.label {
            SlotLabel::Number(number) => number.to_string(),
            SlotLabel::Special => SPECIAL_MARKER.to_string(),
        };
        out.push_str(&format!(
            r##"<text x="{}" y="{}" dominant-baseline="middle" text-anchor="middle" style="font-size: {}px;" fill="#666">{}</text>"##,
            num(slot_box.midpoint()),
            num(OUTER_STROKE_WIDTH + INNER_WIDTH / 2.0),
            num(INNER_WIDTH / 1.75),
            label
        ));
    }

    for outline in &scene.outlines {
        write_rect(
            out,
            outline.x_start + OUTER_STROKE_WIDTH / 2.0,
            OUTER_STROKE_WIDTH / 2.0,
            outline.x_end - outline.x_start,
            BOX_HEIGHT - OUTER_STROKE_WIDTH,
            OUTER_STROKE_WIDTH,
            None,
            Some(0.0),
        );
    }
}

fn write_separator(out: &mut String, center: f64) {
    let length = 0.5 * BOX_HEIGHT.min(INTER_SEGMENT_SPACING);
    let half = length / 2.0;
    let mid_y = BOX_HEIGHT / 2.0;
    out.push_str("<g>");
    write_line(out, center - half, mid_y, center + half, mid_y, OUTER_STROKE_WIDTH);
    write_line(out, center, mid_y - half, center, mid_y + half, OUTER_STROKE_WIDTH);
    out.push_str("</g>");
}

fn write_line(out: &mut String, x1: f64, y1: f64, x2: f64, y2: f64, stroke_width: f64) {
    out.push_str(&format!(
        r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="black" stroke-width="{}"/>"#,
        num(x1),
        num(y1),
        num(x2),
        num(y2),
        num(stroke_width)
    ));
}

#[allow(clippy::too_many_arguments)]
fn write_rect(
    out: &mut String,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    stroke_width: f64,
    fill: Option<&str>,
    fill_opacity: Option<f64>,
) {
    out.push_str(&format!(
        r#"<rect x="{}" y="{}" width="{}" height="{}" stroke="black" stroke-width="{}""#,
        num(x),
        num(y),
        num(width),
        num(height),
        num(stroke_width)
    ));
    if let Some(fill) = fill {
        out.push_str(&format!(r#" fill="{fill}""#));
    }
    if let Some(opacity) = fill_opacity {
        out.push_str(&format!(r#" fill-opacity="{}""#, num(opacity)));
    }
    out.push_str("/>");
}

fn num(value: f64) -> String {
    let text = format!("{value:.3}");
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" || trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
