use std::sync::{Arc, Mutex};

use gantry::chain::{engine, ErrorPageIntercepter};
use gantry::model::RequestUrl;
use gantry::{Application, Context, Flow, Intercepter, Phase, Request, RoutePattern, TemplateStore};
use http::Method;
use serde_json::{json, Value};

mod tracing_util;
use tracing_util::TestTracing;

type Log = Arc<Mutex<Vec<String>>>;

fn record(log: &Log, entry: impl Into<String>) {
    log.lock().unwrap().push(entry.into());
}

/// Intercepter that records every invocation and can be told to stop or
/// panic in either phase.
struct Probe {
    id: usize,
    log: Log,
    stop_on: Option<Phase>,
    panic_on: Option<Phase>,
}

impl Probe {
    fn passing(id: usize, log: &Log) -> Arc<dyn Intercepter> {
        Arc::new(Self {
            id,
            log: Arc::clone(log),
            stop_on: None,
            panic_on: None,
        })
    }

    fn stopping(id: usize, log: &Log, phase: Phase) -> Arc<dyn Intercepter> {
        Arc::new(Self {
            id,
            log: Arc::clone(log),
            stop_on: Some(phase),
            panic_on: None,
        })
    }

    fn panicking(id: usize, log: &Log, phase: Phase) -> Arc<dyn Intercepter> {
        Arc::new(Self {
            id,
            log: Arc::clone(log),
            stop_on: None,
            panic_on: Some(phase),
        })
    }
}

impl Intercepter for Probe {
    fn handle(&self, _ctx: &mut Context, phase: Phase) -> Flow {
        record(&self.log, format!("{}:{:?}", self.id, phase));
        if self.panic_on == Some(phase) {
            panic!("probe {} exploded", self.id);
        }
        if self.stop_on == Some(phase) {
            Flow::Stop
        } else {
            Flow::Pass
        }
    }
}

fn context_for(app: Arc<Application>, path: &str) -> Context {
    let mut request = Request::new();
    request.method = Method::GET;
    request.url = RequestUrl::parse(path, None).unwrap();
    Context::new(request, app)
}

fn app_with_handler(intercepters: Vec<Arc<dyn Intercepter>>, log: &Log) -> Arc<Application> {
    let mut app = Application::new();
    for ic in intercepters {
        app.add_intercepter(ic);
    }
    let log = Arc::clone(log);
    app.add_handler(
        &[Method::GET],
        RoutePattern::Equals("/t".to_string()),
        Arc::new(move |ctx| {
            record(&log, "H");
            ctx.response.set_body("handled");
            Flow::Pass
        }),
        None,
    );
    Arc::new(app)
}

#[test]
fn test_full_pass_wraps_handler_symmetrically() {
    let _tracing = TestTracing::init();
    let log: Log = Arc::default();
    let app = app_with_handler(
        vec![
            Probe::passing(0, &log),
            Probe::passing(1, &log),
            Probe::passing(2, &log),
        ],
        &log,
    );
    let mut ctx = context_for(app, "/t");
    engine::run(&mut ctx);

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "0:Request",
            "1:Request",
            "2:Request",
            "H",
            "2:Response",
            "1:Response",
            "0:Response",
        ]
    );
    assert_eq!(ctx.response.body(), Some("handled"));
}

#[test]
fn test_request_stop_unwinds_from_same_cursor() {
    let log: Log = Arc::default();
    let app = app_with_handler(
        vec![
            Probe::passing(0, &log),
            Probe::stopping(1, &log, Phase::Request),
            Probe::passing(2, &log),
        ],
        &log,
    );
    let mut ctx = context_for(app, "/t");
    engine::run(&mut ctx);

    // the stopping intercepter itself unwinds first; the handler and the
    // never-visited tail do not run at all
    assert_eq!(
        *log.lock().unwrap(),
        vec!["0:Request", "1:Request", "1:Response", "0:Response"]
    );
    assert_eq!(ctx.response.body(), None);
}

#[test]
fn test_first_intercepter_stop_still_unwinds_itself() {
    let log: Log = Arc::default();
    let app = app_with_handler(
        vec![
            Probe::stopping(0, &log, Phase::Request),
            Probe::passing(1, &log),
        ],
        &log,
    );
    let mut ctx = context_for(app, "/t");
    engine::run(&mut ctx);

    assert_eq!(*log.lock().unwrap(), vec!["0:Request", "0:Response"]);
}

#[test]
fn test_response_stop_terminates_unwinding() {
    let log: Log = Arc::default();
    let app = app_with_handler(
        vec![
            Probe::passing(0, &log),
            Probe::stopping(1, &log, Phase::Response),
            Probe::passing(2, &log),
        ],
        &log,
    );
    let mut ctx = context_for(app, "/t");
    engine::run(&mut ctx);

    // intercepter 0 never sees the response phase
    assert_eq!(
        *log.lock().unwrap(),
        vec!["0:Request", "1:Request", "2:Request", "H", "2:Response", "1:Response"]
    );
}

#[test]
fn test_intercepter_panic_is_an_implicit_stop() {
    let log: Log = Arc::default();
    let app = app_with_handler(
        vec![
            Probe::passing(0, &log),
            Probe::panicking(1, &log, Phase::Request),
            Probe::passing(2, &log),
        ],
        &log,
    );
    let mut ctx = context_for(app, "/t");
    engine::run(&mut ctx);

    // recovered at the call site; unwinding starts at the failed step
    assert_eq!(
        *log.lock().unwrap(),
        vec!["0:Request", "1:Request", "1:Response", "0:Response"]
    );
    assert_eq!(ctx.response.body(), None);
}

#[test]
fn test_handler_panic_does_not_kill_the_unwind() {
    let log: Log = Arc::default();
    let mut app = Application::new();
    app.add_intercepter(Probe::passing(0, &log));
    let log_h = Arc::clone(&log);
    app.add_handler(
        &[Method::GET],
        RoutePattern::Equals("/t".to_string()),
        Arc::new(move |_ctx| {
            record(&log_h, "H");
            panic!("handler exploded");
        }),
        None,
    );
    let mut ctx = context_for(Arc::new(app), "/t");
    engine::run(&mut ctx);

    assert_eq!(*log.lock().unwrap(), vec!["0:Request", "H", "0:Response"]);
    // no body was set and the core invents no status on the handler's behalf
    assert_eq!(ctx.response.body(), None);
    assert_eq!(ctx.response.status, 200);
}

#[test]
fn test_unrouted_paths_produce_distinct_outcomes() {
    let log: Log = Arc::default();
    let app = app_with_handler(vec![], &log);

    let mut ctx = context_for(Arc::clone(&app), "/missing");
    engine::run(&mut ctx);
    assert_eq!(ctx.response.status, 404);

    let mut ctx = context_for(app, "/t");
    ctx.request.method = Method::POST;
    engine::run(&mut ctx);
    assert_eq!(ctx.response.status, 501);
}

/// Trivial template collaborator echoing the template name and one model key.
struct StubTemplates;

impl TemplateStore for StubTemplates {
    fn render(&self, name: &str, model: &Value) -> Result<String, String> {
        let title = model.get("title").and_then(|v| v.as_str()).unwrap_or("");
        Ok(format!("<h1>{name}</h1>{title}"))
    }
}

#[test]
fn test_handler_renders_resolved_template() {
    let mut app = Application::new();
    app.set_template_store(Arc::new(StubTemplates));
    app.add_handler(
        &[Method::GET],
        RoutePattern::Equals("/t".to_string()),
        Arc::new(|ctx| {
            ctx.set("title", json!("Welcome"));
            ctx.render();
            Flow::Pass
        }),
        Some("greeting"),
    );
    let mut ctx = context_for(Arc::new(app), "/t");
    engine::run(&mut ctx);

    assert_eq!(ctx.response.body(), Some("<h1>greeting</h1>Welcome"));
    assert_eq!(
        ctx.response.headers.get("content-type"),
        Some("text/html; charset=utf-8")
    );
}

#[test]
fn test_error_page_intercepter_renders_on_empty_error_body() {
    let mut app = Application::new();
    app.set_template_store(Arc::new(StubTemplates));
    app.add_intercepter(Arc::new(ErrorPageIntercepter::new("error")));
    app.add_handler(
        &[Method::GET],
        RoutePattern::Equals("/boom".to_string()),
        Arc::new(|ctx| {
            ctx.response.status = 500;
            panic!("handler exploded before writing a body");
        }),
        None,
    );
    let mut ctx = context_for(Arc::new(app), "/boom");
    engine::run(&mut ctx);

    assert_eq!(ctx.response.status, 500);
    assert_eq!(ctx.response.body(), Some("<h1>error</h1>"));
}

#[test]
fn test_error_page_leaves_populated_bodies_alone() {
    let mut app = Application::new();
    app.set_template_store(Arc::new(StubTemplates));
    app.add_intercepter(Arc::new(ErrorPageIntercepter::new("error")));
    let mut ctx = context_for(Arc::new(app), "/missing");
    engine::run(&mut ctx);

    // the routing outcome already produced a body; the intercepter passes
    assert_eq!(ctx.response.status, 404);
    assert_eq!(ctx.response.body(), Some("Not Found"));
}

#[test]
fn test_handler_binds_params_and_template() {
    let log: Log = Arc::default();
    let mut app = Application::new();
    let log_h = Arc::clone(&log);
    app.add_handler(
        &[Method::GET],
        RoutePattern::Regex("/pets/{{id}}".to_string()),
        Arc::new(move |ctx| {
            record(
                &log_h,
                format!("id={}", ctx.request.path_param("id").unwrap_or("?")),
            );
            Flow::Pass
        }),
        Some("pet_detail"),
    );
    let mut ctx = context_for(Arc::new(app), "/pets/99");
    engine::run(&mut ctx);

    assert_eq!(*log.lock().unwrap(), vec!["id=99"]);
    assert_eq!(ctx.template(), Some("pet_detail"));
}
