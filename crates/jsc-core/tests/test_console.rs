use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use jsc_core::error::{ConsoleError, Result};
use jsc_core::keybind::{KEY_BACKTICK, KEY_ENTER, KEY_UP};
use jsc_core::loader::ScriptLoader;
use jsc_core::value::HostRef;
use jsc_core::{
    Category, ConsoleBridge, ConsoleConfig, ConsoleSession, KeyEvent, Overlay, RunOutcome,
    Sandbox, Value,
};

/// Tiny calculator: integers, `a+b`, `log <word>`, `warn <word>`, `window`,
/// `loaded` (how many scripts were injected).
struct CalcSandbox {
    bridge: ConsoleBridge,
    scripts: usize,
}

impl Sandbox for CalcSandbox {
    fn evaluate(&mut self, code: &str) -> Result<Value> {
        if let Some(word) = code.strip_prefix("log ") {
            self.bridge.log(word);
            return Ok(Value::Undefined);
        }
        if let Some(word) = code.strip_prefix("warn ") {
            self.bridge.warn(word);
            return Ok(Value::Undefined);
        }
        if code == "window" {
            let host = HostRef::new("Window");
            host.set("document", HostRef::new("HTMLDocument").into());
            host.set("innerWidth", Value::from(1024i64));
            return Ok(host.into());
        }
        if code == "loaded" {
            return Ok(Value::Number(self.scripts as f64));
        }
        let sum = code
            .split('+')
            .map(|part| part.trim().parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| ConsoleError::evaluation(format!("SyntaxError: {}", code)))?;
        Ok(Value::Number(sum.into_iter().sum()))
    }

    fn inject(&mut self, source: &str) -> Result<()> {
        if source.is_empty() {
            return Err(ConsoleError::evaluation("empty script"));
        }
        self.scripts += 1;
        Ok(())
    }
}

struct MapLoader(HashMap<String, String>);

#[async_trait]
impl ScriptLoader for MapLoader {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.0
            .get(url)
            .cloned()
            .ok_or_else(|| ConsoleError::load(url, "404 Not Found"))
    }
}

fn session() -> ConsoleSession {
    ConsoleSession::new(
        |bridge: ConsoleBridge| -> Box<dyn Sandbox> {
            Box::new(CalcSandbox { bridge, scripts: 0 })
        },
        &ConsoleConfig::default(),
    )
}

fn contents(session: &ConsoleSession) -> Vec<(Category, &str)> {
    session
        .output()
        .lines()
        .iter()
        .map(|line| (line.category, line.content.as_str()))
        .collect()
}

#[test]
fn test_evaluate_one_plus_one() {
    let mut session = session();
    assert_eq!(session.run("1+1"), RunOutcome::Evaluated);
    assert_eq!(
        contents(&session),
        vec![(Category::Echo, "1+1"), (Category::Response, "2")]
    );
}

#[test]
fn test_host_object_dump() {
    let mut session = session();
    session.run("window");

    let response = session.output().last().unwrap();
    assert_eq!(response.category, Category::Response);
    assert_eq!(
        response.content,
        "[object Window]{\ndocument: [object HTMLDocument],\ninnerWidth: 1024\n}"
    );
}

#[test]
fn test_bridge_warn_is_escaped() {
    let mut session = session();
    session.run("warn <b>");
    assert!(contents(&session).contains(&(Category::Warn, "&lt;b&gt;")));
}

#[test]
fn test_repeated_logs_collapse() {
    let mut session = session();
    session.run("log x");
    session.run("log x");

    let logs: Vec<_> = session
        .output()
        .lines()
        .iter()
        .filter(|line| line.category == Category::Log)
        .collect();
    assert_eq!(logs.len(), 2, "echo lines separate the two logs");

    session.log(&Value::from("x"));
    assert_eq!(session.output().last().unwrap().count, None);
    session.log(&Value::from("x"));
    assert_eq!(session.output().last().unwrap().count, Some(2));
    session.log(&Value::from("x"));
    assert_eq!(session.output().last().unwrap().count, Some(3));
}

#[test]
fn test_keyboard_round_trip() {
    let mut overlay = Overlay::new(session());
    overlay.key_down(&KeyEvent::new(KEY_BACKTICK));

    for input in ["1+2", "3+4"] {
        overlay.insert_text(input);
        overlay.key_down(&KeyEvent::new(KEY_ENTER));
    }
    assert_eq!(overlay.session().history().len(), 2);

    overlay.insert_text("draft");
    overlay.key_down(&KeyEvent::new(KEY_UP));
    assert_eq!(overlay.session().input(), "3+4");
    overlay.key_down(&KeyEvent::new(KEY_UP));
    assert_eq!(overlay.session().input(), "1+2");
    overlay.key_down(&KeyEvent::new(KEY_UP));
    assert_eq!(overlay.session().input(), "1+2");
}

#[tokio::test]
async fn test_reset_clears_sandbox_state() {
    let loader = MapLoader(HashMap::from([("a.js".to_string(), "void 0".to_string())]));
    let mut session = session().with_loader(Arc::new(loader));
    session.run(":load a.js");
    while session.next_load().await {}
    session.run("loaded");
    assert_eq!(session.output().last().unwrap().content, "1");

    session.run(":clear");
    session.run(":reset");
    assert_eq!(
        contents(&session),
        vec![(Category::Echo, ":reset"), (Category::Info, "Variables reset.")]
    );

    session.run("loaded");
    assert_eq!(session.output().last().unwrap().content, "0");
}

#[tokio::test]
async fn test_load_library_and_url() {
    let loader = MapLoader(HashMap::from([
        (
            "http://code.jquery.com/jquery-latest.min.js".to_string(),
            "window.jQuery = {}".to_string(),
        ),
        ("http://cdn.test/empty.js".to_string(), String::new()),
    ]));
    let mut session = session().with_loader(Arc::new(loader));

    session.run(":load jquery http://cdn.test/missing.js http://cdn.test/empty.js");
    assert_eq!(session.pending_loads(), 3);

    while session.next_load().await {}
    assert_eq!(session.pending_loads(), 0);

    let info: Vec<_> = session
        .output()
        .lines()
        .iter()
        .filter(|line| line.category == Category::Info)
        .collect();
    assert_eq!(info.len(), 1);
    assert!(info[0].content.starts_with("Loaded script from `http:&#x2F;&#x2F;code.jquery.com"));

    let errors = session
        .output()
        .lines()
        .iter()
        .filter(|line| line.category == Category::Error)
        .count();
    assert_eq!(errors, 2);

    session.run("loaded");
    assert_eq!(session.output().last().unwrap().content, "1");
}

#[tokio::test]
async fn test_pump_applies_finished_loads() {
    let loader = MapLoader(HashMap::from([(
        "a.js".to_string(),
        "void 0".to_string(),
    )]));
    let mut session = session().with_loader(Arc::new(loader));
    session.run(":load a.js");

    while session.pending_loads() > 0 {
        tokio::task::yield_now().await;
        session.pump();
    }
    assert_eq!(
        session.output().last().unwrap().content,
        "Loaded script from `a.js`"
    );
}
