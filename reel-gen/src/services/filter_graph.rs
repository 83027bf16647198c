//! ffmpeg serialization of the composition graph
//!
//! The graph becomes one `-filter_complex` expression plus structured
//! arguments. No shell is involved; caption text and paths are escaped for
//! the filter-graph grammar, never interpolated raw.

use std::ffi::OsString;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::models::{
    AudioEntry, CaptionOverlay, CompositionGraph, EnergyTag, SceneEffect, SceneNode, SceneSource,
};

const AUDIO_SAMPLE_RATE: u32 = 44_100;

/// Everything the encoder needs for one job
#[derive(Debug, Clone)]
pub struct EncodeRequest {
    /// Narration files, in `-i` order
    pub inputs: Vec<PathBuf>,
    pub filter_graph: String,
    pub output: PathBuf,
    pub duration: f64,
    pub fps: u32,
}

impl EncodeRequest {
    /// Serialize a compiled graph
    pub fn from_graph(graph: &CompositionGraph, output: PathBuf, font_file: Option<&Path>) -> Self {
        Self {
            inputs: graph.audio.asset_paths().iter().map(|p| p.to_path_buf()).collect(),
            filter_graph: build_filter_graph(graph, font_file),
            output,
            duration: graph.total_duration(),
            fps: graph.canvas.fps,
        }
    }

    /// ffmpeg argument vector (program name excluded)
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-y"]
            .iter()
            .map(OsString::from)
            .collect();
        for input in &self.inputs {
            args.push("-i".into());
            args.push(input.as_os_str().to_owned());
        }
        let fps = self.fps.to_string();
        let duration = format!("{:.3}", self.duration);
        for arg in [
            "-filter_complex",
            self.filter_graph.as_str(),
            "-map",
            "[vout]",
            "-map",
            "[aout]",
            "-c:v",
            "libx264",
            "-preset",
            "veryfast",
            "-crf",
            "20",
            "-pix_fmt",
            "yuv420p",
            "-r",
            fps.as_str(),
            "-c:a",
            "aac",
            "-b:a",
            "160k",
            "-t",
            duration.as_str(),
            "-movflags",
            "+faststart",
            "-f",
            "mp4",
        ] {
            args.push(arg.into());
        }
        args.push(self.output.as_os_str().to_owned());
        args
    }
}

/// Build the `-filter_complex` expression
pub fn build_filter_graph(graph: &CompositionGraph, font_file: Option<&Path>) -> String {
    let mut chains: Vec<String> = Vec::new();

    for scene in &graph.scenes {
        chains.push(scene_chain(scene, graph));
    }

    // Transitions
    let mut current = format!("v{}", graph.scenes.first().map(|s| s.index).unwrap_or(0));
    for (i, edge) in graph.transitions.iter().enumerate() {
        let out = format!("x{}", i + 1);
        chains.push(format!(
            "[{}][v{}]xfade=transition={}:duration={:.3}:offset={:.3}[{}]",
            current,
            edge.to,
            edge.kind.as_ffmpeg(),
            edge.duration,
            edge.offset,
            out
        ));
        current = out;
    }

    // Captions over the finished visual track
    let mut overlay = format!("[{}]", current);
    let drawtexts: Vec<String> = graph
        .captions
        .iter()
        .filter(|c| c.end > c.start && !c.text.trim().is_empty())
        .map(|c| drawtext(c, graph.canvas.height, font_file))
        .collect();
    for filter in &drawtexts {
        overlay.push_str(filter);
        overlay.push(',');
    }
    overlay.push_str("format=yuv420p[vout]");
    chains.push(overlay);

    // Audio
    let mut input_index = 0;
    let mut audio_labels = String::new();
    for (k, entry) in graph.audio.entries.iter().enumerate() {
        let label = format!("a{}", k);
        let chain = match entry {
            AudioEntry::Asset { duration, .. } => {
                let chain = format!(
                    "[{}:a]aresample={},aformat=channel_layouts=stereo,apad,atrim=duration={:.3},asetpts=PTS-STARTPTS[{}]",
                    input_index, AUDIO_SAMPLE_RATE, duration, label
                );
                input_index += 1;
                chain
            }
            AudioEntry::Silence { duration, .. } => format!(
                "anullsrc=r={}:cl=stereo,atrim=duration={:.3},asetpts=PTS-STARTPTS[{}]",
                AUDIO_SAMPLE_RATE, duration, label
            ),
        };
        chains.push(chain);
        let _ = write!(audio_labels, "[{}]", label);
    }
    chains.push(format!(
        "{}concat=n={}:v=0:a=1[aout]",
        audio_labels,
        graph.audio.entries.len()
    ));

    chains.join(";")
}

fn scene_chain(scene: &SceneNode, graph: &CompositionGraph) -> String {
    let canvas = graph.canvas;
    let length = scene.render_duration();
    let frames = (length * canvas.fps as f64).ceil().max(1.0);
    let SceneSource::Gradient { from, to } = &scene.source;

    let source = format!(
        "gradients=s={w}x{h}:c0={from}:c1={to}:x0=0:y0=0:x1={w}:y1={h}:speed=0.015:r={fps}:d={length:.3}",
        w = canvas.width,
        h = canvas.height,
        from = from,
        to = to,
        fps = canvas.fps,
        length = length,
    );

    let effect = match scene.effect {
        SceneEffect::SlowZoom => zoom(canvas.width, canvas.height, canvas.fps, 0.10, frames),
        SceneEffect::PunchZoom => zoom(canvas.width, canvas.height, canvas.fps, 0.25, frames),
        SceneEffect::DriftPan => format!(
            "scale=iw*1.15:ih*1.15,crop={w}:{h}:x='(iw-ow)*t/{length:.3}':y='(ih-oh)/2'",
            w = canvas.width,
            h = canvas.height,
            length = length.max(0.001),
        ),
    };

    format!(
        "{},{},setsar=1,format=yuv420p[v{}]",
        source, effect, scene.index
    )
}

/// zoompan growing linearly to `1 + amount` over the scene
fn zoom(width: u32, height: u32, fps: u32, amount: f64, frames: f64) -> String {
    format!(
        "zoompan=z='min(1+{rate:.6}*in,{max:.3})':d=1:x='iw/2-(iw/zoom/2)':y='ih/2-(ih/zoom/2)':s={w}x{h}:fps={fps}",
        rate = amount / frames,
        max = 1.0 + amount,
        w = width,
        h = height,
        fps = fps,
    )
}

fn drawtext(caption: &CaptionOverlay, canvas_height: u32, font_file: Option<&Path>) -> String {
    let (size, color) = match caption.energy {
        EnergyTag::High => (canvas_height / 22, "yellow"),
        EnergyTag::Medium => (canvas_height / 26, "white"),
        EnergyTag::Low => (canvas_height / 30, "white"),
    };

    let mut filter = String::from("drawtext=");
    if let Some(font) = font_file {
        let _ = write!(
            filter,
            "fontfile={}:",
            quote_filter_value(&escape_option_value(&font.to_string_lossy()))
        );
    }
    let _ = write!(
        filter,
        "text={}:expansion=none:fontsize={}:fontcolor={}:borderw=4:bordercolor=black:x=(w-text_w)/2:y=h*0.72:enable='between(t,{:.3},{:.3})'",
        quote_filter_value(&escape_option_value(&caption.text)),
        size,
        color,
        caption.start,
        caption.end
    );
    filter
}

/// Escape a value for a filter option (`key=value:key=value` level)
pub fn escape_option_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 8);
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            ':' => escaped.push_str("\\:"),
            '\n' | '\r' | '\t' => escaped.push(' '),
            c if c.is_control() => {}
            c => escaped.push(c),
        }
    }
    escaped
}

/// Quote an option value for the filter-graph level
///
/// Inside single quotes `,;[]` are literal; an embedded quote closes the
/// quoted run, is escaped, and reopens it.
pub fn quote_filter_value(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AudioTrackPlan, Canvas, TransitionEdge, TransitionKind};

    fn scene(index: usize, duration: f64, lead_in: f64) -> SceneNode {
        SceneNode {
            index,
            segment_index: index,
            source: SceneSource::Gradient {
                from: "0x000000".into(),
                to: "0xffffff".into(),
            },
            duration,
            lead_in,
            effect: SceneEffect::DriftPan,
        }
    }

    fn graph() -> CompositionGraph {
        CompositionGraph {
            canvas: Canvas {
                width: 1080,
                height: 1920,
                fps: 30,
            },
            scenes: vec![scene(0, 5.0, 0.0), scene(1, 4.0, 0.5)],
            transitions: vec![TransitionEdge {
                from: 0,
                to: 1,
                kind: TransitionKind::WipeUp,
                duration: 0.5,
                offset: 4.5,
            }],
            captions: vec![CaptionOverlay {
                text: "It's 50% off: today, [really]".into(),
                start: 0.0,
                end: 1.5,
                energy: EnergyTag::High,
            }],
            audio: AudioTrackPlan {
                entries: vec![
                    AudioEntry::Asset {
                        segment_index: 0,
                        path: PathBuf::from("/tmp/work/segment_0.mp3"),
                        duration: 5.0,
                    },
                    AudioEntry::Silence {
                        segment_index: 1,
                        duration: 4.0,
                    },
                ],
            },
        }
    }

    #[test]
    fn test_option_escaping() {
        assert_eq!(escape_option_value("a:b"), "a\\:b");
        assert_eq!(escape_option_value("it's"), "it\\'s");
        assert_eq!(escape_option_value("back\\slash"), "back\\\\slash");
        assert_eq!(escape_option_value("two\nlines"), "two lines");
    }

    #[test]
    fn test_graph_quoting() {
        assert_eq!(quote_filter_value("plain, text"), "'plain, text'");
        assert_eq!(quote_filter_value("it\\'s"), "'it\\'\\''s'");
    }

    #[test]
    fn test_filter_graph_structure() {
        let fg = build_filter_graph(&graph(), None);

        assert!(fg.contains("[v0][v1]xfade=transition=wipeup:duration=0.500:offset=4.500[x1]"));
        assert!(fg.contains("enable='between(t,0.000,1.500)'"));
        assert!(fg.contains("[x1]drawtext="));
        assert!(fg.contains("[0:a]aresample=44100"));
        assert!(fg.contains("anullsrc=r=44100:cl=stereo,atrim=duration=4.000"));
        assert!(fg.contains("[a0][a1]concat=n=2:v=0:a=1[aout]"));
        // scene 1 is rendered with its lead-in
        assert!(fg.contains("d=4.500,"));
        // caption text never appears unquoted
        assert!(!fg.contains("text=It's"));
    }

    #[test]
    fn test_args_are_structured() {
        let g = graph();
        let request = EncodeRequest::from_graph(&g, PathBuf::from("/out/job.mp4"), None);
        let args = request.to_args();

        assert_eq!(request.inputs, vec![PathBuf::from("/tmp/work/segment_0.mp3")]);
        let position = args.iter().position(|a| a == "-filter_complex").unwrap();
        assert_eq!(args[position + 1], OsString::from(request.filter_graph.clone()));
        assert_eq!(args.last().unwrap(), &OsString::from("/out/job.mp4"));
        assert_eq!(args.iter().filter(|a| *a == "-i").count(), 1);
    }

    #[test]
    fn test_single_scene_maps_directly_to_overlay() {
        let mut g = graph();
        g.scenes.truncate(1);
        g.transitions.clear();
        g.captions.clear();
        let fg = build_filter_graph(&g, None);
        assert!(fg.contains("[v0]format=yuv420p[vout]"));
        assert!(!fg.contains("xfade"));
    }
}
