use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

use dispersion_viz::payload::RenderPayload;
use dispersion_viz::selector::InteractiveSelector;
use dispersion_viz::{telemetry, Config, DatasetCache, PerRegime, Regime};

/// Serve the interactive band viewer.
#[derive(Parser)]
#[command(name = "web")]
struct Args {
    /// JSON config file.
    #[arg(long, env = "DISPERSION_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address (overrides the config).
    #[arg(long)]
    addr: Option<String>,
}

#[derive(Clone)]
struct AppState {
    selector: Arc<Mutex<InteractiveSelector>>,
    regimes: Arc<Vec<RegimeInfo>>,
}

#[derive(Serialize, Clone)]
struct RegimeInfo {
    label: Regime,
    title: &'static str,
    max_kx: f64,
    max_ky: f64,
    nx: usize,
    ny: usize,
    gaps: usize,
}

#[derive(Serialize)]
struct RegimesResponse {
    current: Regime,
    regimes: Vec<RegimeInfo>,
}

#[derive(Deserialize)]
struct SelectRequest {
    regime: String,
}

#[derive(Serialize)]
struct SelectResponse {
    regime: Regime,
    recognized: bool,
    changed: bool,
    payload: Arc<RenderPayload>,
}

const INDEX_HTML: &str = r##"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Band Dispersion</title>
    <script src="https://cdn.plot.ly/plotly-2.27.0.min.js" charset="utf-8"></script>
    <style>
      html, body { margin: 0; padding: 0; height: 100%; background: #0b0c10; color: #e6e6e6; font-family: "Segoe UI", sans-serif; }
      #panel { position: absolute; top: 12px; left: 12px; z-index: 2; width: 280px; background: rgba(10,12,16,0.9); padding: 12px; border: 1px solid #2a2f36; border-radius: 10px; }
      #infoButton { position: absolute; top: 12px; right: 12px; z-index: 2; background: #11151b; border: 1px solid #2a2f36; color: #e6e6e6; border-radius: 8px; padding: 6px 10px; font-size: 12px; text-decoration: none; }
      .brand { font-size: 16px; font-weight: 600; }
      .row { display: flex; align-items: center; gap: 6px; margin-top: 8px; }
      .row label { font-size: 11px; color: #a7b0ba; }
      select { flex: 1; background: #0f141b; color: #e6e6e6; border: 1px solid #2a2f36; border-radius: 6px; padding: 4px 6px; font-size: 12px; }
      #status { margin-top: 8px; font-size: 12px; color: #b2bac4; }
      #plot { position: absolute; inset: 0; display: flex; align-items: center; justify-content: center; }
    </style>
  </head>
  <body>
    <a id="infoButton" href="/info">Info</a>
    <div id="panel">
      <div class="brand">Band Dispersion</div>
      <div class="row">
        <label for="regime">Range</label>
        <select id="regime"></select>
      </div>
      <div id="status">Loading…</div>
    </div>
    <div id="plot"></div>
    <script>
      const select = document.getElementById("regime");
      const status = document.getElementById("status");
      let regimes = [];

      function describe(label) {
        const r = regimes.find((x) => x.label === label);
        if (!r) return label;
        const gaps = r.gaps ? `, ${r.gaps} gaps` : "";
        return `${r.title}: ${r.nx}×${r.ny}${gaps}`;
      }

      function draw(payload) {
        Plotly.react("plot", payload.data, payload.layout);
        select.value = payload.regime;
        status.textContent = describe(payload.regime);
      }

      async function init() {
        const list = await (await fetch("/regimes")).json();
        regimes = list.regimes;
        for (const r of regimes) {
          const opt = document.createElement("option");
          opt.value = r.label;
          opt.textContent = r.title;
          select.appendChild(opt);
        }
        draw(await (await fetch("/figure")).json());
      }

      select.addEventListener("change", async () => {
        select.disabled = true;
        try {
          const res = await fetch("/select", {
            method: "POST",
            headers: { "Content-Type": "application/json" },
            body: JSON.stringify({ regime: select.value }),
          });
          const body = await res.json();
          draw(body.payload);
        } catch (err) {
          status.textContent = `Selection failed: ${err}`;
        } finally {
          select.disabled = false;
        }
      });

      init().catch((err) => { status.textContent = `Load failed: ${err}`; });
    </script>
  </body>
</html>
"##;

const INFO_HTML: &str = r##"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <title>Band Dispersion: Info</title>
    <style>
      body { margin: 0 auto; max-width: 720px; padding: 24px; background: #0b0c10; color: #e6e6e6; font-family: "Segoe UI", sans-serif; line-height: 1.5; }
      code { background: #11151b; padding: 1px 4px; border-radius: 4px; }
      a { color: #7fb3ff; }
    </style>
  </head>
  <body>
    <a href="/">Back</a>
    <h2>Model</h2>
    <p><code>ε±(kx, ky) = ±t √(1 + 4 cos(3 kx a / 2) cos(√3 ky a / 2) + cos²(√3 ky a / 2))</code></p>
    <p>Both bands come from one evaluation; the lower band is the negation of the upper one.
    Where the expression under the root is negative the surface has a hole.</p>
    <p>Each range is evaluated once when the server starts. Switching ranges only redraws.</p>
  </body>
</html>
"##;

async fn index() -> impl IntoResponse {
    Html(INDEX_HTML)
}

async fn info() -> impl IntoResponse {
    Html(INFO_HTML)
}

async fn regimes(State(state): State<AppState>) -> impl IntoResponse {
    let current = state.selector.lock().await.regime();
    Json(RegimesResponse {
        current,
        regimes: state.regimes.as_ref().clone(),
    })
}

async fn figure(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.selector.lock().await.current_payload())
}

async fn select(State(state): State<AppState>, Json(req): Json<SelectRequest>) -> Response {
    // Held across the render so selections are applied strictly one at a time.
    let mut guard = state.selector.clone().lock_owned().await;
    let transition = tokio::task::spawn_blocking(move || guard.select(&req.regime)).await;
    match transition {
        Ok(t) => Json(SelectResponse {
            regime: t.regime,
            recognized: t.recognized,
            changed: t.changed,
            payload: t.payload,
        })
        .into_response(),
        Err(err) => {
            error!(error = %err, "selection task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "selection failed").into_response()
        }
    }
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/info", get(info))
        .route("/regimes", get(regimes))
        .route("/figure", get(figure))
        .route("/select", post(select))
        .with_state(state)
}

/// Evaluates every interactive regime up front and wires the selector.
fn build_state(config: &Config, cache: &DatasetCache) -> dispersion_viz::Result<AppState> {
    let table = PerRegime {
        small_range: Regime::SmallRange,
        large_range: Regime::LargeRange,
    };
    let datasets = table.try_map(|regime, _| {
        let spec = config.interactive_regime(regime);
        cache.get_or_evaluate(spec.bounds, spec.resolution, spec.parameters)
    })?;
    let regimes = datasets
        .iter()
        .map(|(regime, ds)| RegimeInfo {
            label: regime,
            title: regime.title(),
            max_kx: ds.bounds().max_kx,
            max_ky: ds.bounds().max_ky,
            nx: ds.resolution().nx,
            ny: ds.resolution().ny,
            gaps: ds.stats().gaps,
        })
        .collect();
    let selector = InteractiveSelector::new(
        datasets,
        config.interactive.default_regime,
        config.interactive.surface,
    );
    Ok(AppState {
        selector: Arc::new(Mutex::new(selector)),
        regimes: Arc::new(regimes),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("loading config")?;
    if let Some(addr) = args.addr {
        config.interactive.addr = addr;
    }
    let addr: SocketAddr = config
        .interactive
        .addr
        .parse()
        .with_context(|| format!("invalid listen address {:?}", config.interactive.addr))?;

    let state = tokio::task::spawn_blocking(move || {
        let cache = DatasetCache::new();
        build_state(&config, &cache)
    })
    .await
    .context("dataset evaluation task")??;

    let app = app(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Serving on http://{addr}");
    axum::serve(listener, app).await.context("server")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispersion_viz::grid::Resolution;

    fn test_state() -> (AppState, DatasetCache) {
        let mut config = Config::default();
        config.interactive.resolution = Resolution::square(8).unwrap();
        let cache = DatasetCache::new();
        let state = build_state(&config, &cache).unwrap();
        (state, cache)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_regimes_lists_both() {
        let (state, cache) = test_state();
        assert_eq!(cache.evaluations(), 2);
        let json = body_json(regimes(State(state)).await.into_response()).await;
        assert_eq!(json["current"], "small-range");
        assert_eq!(json["regimes"].as_array().unwrap().len(), 2);
        assert_eq!(json["regimes"][1]["label"], "large-range");
        assert_eq!(json["regimes"][1]["max_kx"], 50.0);
    }

    #[tokio::test]
    async fn test_select_switches_without_evaluating() {
        let (state, cache) = test_state();
        let req = SelectRequest {
            regime: "large-range".into(),
        };
        let json = body_json(select(State(state.clone()), Json(req)).await).await;
        assert_eq!(json["changed"], true);
        assert_eq!(json["payload"]["regime"], "large-range");
        assert_eq!(json["payload"]["data"].as_array().unwrap().len(), 2);
        assert_eq!(cache.evaluations(), 2);

        let fig = body_json(figure(State(state)).await.into_response()).await;
        assert_eq!(fig, json["payload"]);
    }

    #[tokio::test]
    async fn test_unknown_selection_keeps_state() {
        let (state, _cache) = test_state();
        let before = body_json(figure(State(state.clone())).await.into_response()).await;
        let req = SelectRequest {
            regime: "sideways".into(),
        };
        let json = body_json(select(State(state.clone()), Json(req)).await).await;
        assert_eq!(json["recognized"], false);
        assert_eq!(json["regime"], "small-range");
        assert_eq!(json["payload"], before);
        let after = body_json(figure(State(state)).await.into_response()).await;
        assert_eq!(after, before);
    }
}
