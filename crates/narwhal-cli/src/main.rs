use futures::executor::block_on;
use narwhal::geom::Rect;
use narwhal::{
    BoxMeasurer, DataEvent, DiagramConfig, DiagramData, DiagramEngine, GridLayout, LinkId,
    LinkPath, RenderOutcome, Transition,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Read;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Engine(narwhal::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Engine(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<narwhal::Error> for CliError {
    fn from(value: narwhal::Error) -> Self {
        Self::Engine(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Default)]
struct Args {
    input: Option<String>,
    pretty: bool,
    columns: Option<usize>,
}

/// What the CLI replays: a config, the initial content, then steps in order.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Scenario {
    config: Value,
    data: DiagramData,
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
enum Step {
    Expand { id: String },
    Collapse { id: String },
    SetExpanded { ids: Vec<String> },
    Event { event: DataEvent },
    Render,
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::Expand { .. } => "expand",
            Step::Collapse { .. } => "collapse",
            Step::SetExpanded { .. } => "setExpanded",
            Step::Event { .. } => "event",
            Step::Render => "render",
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StepOut {
    op: &'static str,
    superseded: bool,
    transitions: Vec<Transition>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeOut {
    id: String,
    bounds: Option<Rect>,
    disclosed: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LinkOut {
    id: LinkId,
    start_id: String,
    end_id: String,
    constituent_ids: Vec<String>,
    points: LinkPath,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplayOut {
    steps: Vec<StepOut>,
    nodes: Vec<NodeOut>,
    links: Vec<LinkOut>,
}

fn usage() -> &'static str {
    "narwhal\n\
\n\
USAGE:\n\
  narwhal [--pretty] [--columns <n>] [<path>|-]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', the scenario is read from stdin.\n\
  - A scenario is {\"config\": {...}, \"data\": {...}, \"steps\": [...]}; steps use\n\
    {\"op\": \"expand\"|\"collapse\", \"id\": ...}, {\"op\": \"setExpanded\", \"ids\": [...]},\n\
    {\"op\": \"event\", \"event\": {...}} or {\"op\": \"render\"}.\n\
  - Output is one entry per step (load first) with its transitions, then final geometry.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();
    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "--pretty" => args.pretty = true,
            "--columns" => {
                let Some(n) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                let n = n.parse::<usize>().map_err(|_| CliError::Usage(usage()))?;
                if n == 0 {
                    return Err(CliError::Usage(usage()));
                }
                args.columns = Some(n);
            }
            other if other.starts_with("--") => return Err(CliError::Usage(usage())),
            other => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(other.to_string());
            }
        }
    }
    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    Ok(())
}

fn step_out(op: &'static str, outcome: RenderOutcome) -> StepOut {
    match outcome {
        RenderOutcome::Rendered(t) => StepOut {
            op,
            superseded: false,
            transitions: t.directives,
        },
        RenderOutcome::Superseded => StepOut {
            op,
            superseded: true,
            transitions: Vec::new(),
        },
    }
}

fn replay(scenario: Scenario, columns: Option<usize>) -> Result<ReplayOut, CliError> {
    let config = if scenario.config.is_null() {
        DiagramConfig::default()
    } else {
        DiagramConfig::from_json(&scenario.config)?
    };
    let mut layout = GridLayout::default();
    layout.columns = columns;
    let engine = DiagramEngine::new(config, BoxMeasurer::default(), layout);

    let mut steps = vec![step_out("load", block_on(engine.load(scenario.data))?)];
    for step in scenario.steps {
        let op = step.name();
        let outcome = match step {
            Step::Expand { id } => block_on(engine.expand(&id))?,
            Step::Collapse { id } => block_on(engine.collapse(&id))?,
            Step::SetExpanded { ids } => block_on(engine.set_expanded(ids))?,
            Step::Event { event } => block_on(engine.apply_event(event))?,
            Step::Render => block_on(engine.render())?,
        };
        steps.push(step_out(op, outcome));
    }

    let state = engine.state();
    let nodes = state
        .nodes()
        .map(|n| NodeOut {
            id: n.id.clone(),
            bounds: state.global_bounds(&n.id),
            disclosed: n.disclosed(),
        })
        .collect();
    let links = state
        .links()
        .map(|l| {
            let mut points = l.points.clone();
            points.translate(state.space_origin(l.coordinate_space_id.as_deref()).to_vector());
            LinkOut {
                id: l.id.clone(),
                start_id: l.start_id.clone(),
                end_id: l.end_id.clone(),
                constituent_ids: l.constituent_ids().map(str::to_string).collect(),
                points,
            }
        })
        .collect();
    Ok(ReplayOut {
        steps,
        nodes,
        links,
    })
}

fn run(args: Args) -> Result<(), CliError> {
    let text = read_input(args.input.as_deref())?;
    let scenario: Scenario = serde_json::from_str(&text)?;
    let out = replay(scenario, args.columns)?;
    write_json(&out, args.pretty)?;
    println!();
    Ok(())
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
