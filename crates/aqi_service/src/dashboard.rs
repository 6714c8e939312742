//! Single-page dashboard served at `/`; all data comes from the JSON API.
//!
//! Values from the API are only ever inserted as text nodes.

pub const DASHBOARD_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Smart AQI Dashboard</title>
<style>
  body { font-family: system-ui, sans-serif; margin: 0; background: #f4f6f8; color: #1d2733; }
  header { background: #1d2733; color: #fff; padding: 1rem 2rem; }
  main { display: grid; grid-template-columns: 260px 1fr; gap: 1.5rem; padding: 1.5rem 2rem; }
  aside, section { background: #fff; border-radius: 8px; padding: 1rem 1.25rem; margin-bottom: 1.25rem; box-shadow: 0 1px 3px rgba(0,0,0,.08); }
  .legend-row, .bar-row { display: flex; align-items: center; gap: .5rem; margin: .3rem 0; font-size: .9rem; }
  .bar-row .name { width: 9rem; overflow: hidden; text-overflow: ellipsis; white-space: nowrap; }
  .swatch { width: 14px; height: 14px; border-radius: 3px; }
  .cards { display: grid; grid-template-columns: repeat(3, 1fr); gap: 1rem; }
  .card { border-radius: 8px; padding: 1rem; color: #fff; background: #8a96a3; }
  .card h3 { margin: 0 0 .4rem; font-size: .95rem; font-weight: 500; }
  .card .value { font-size: 2.2rem; font-weight: 700; }
  pre.advisory { white-space: pre-wrap; font-family: inherit; background: #fbfbfb; border-left: 4px solid #8a96a3; padding: .75rem 1rem; }
  .bar { background: #4a7bd0; height: 12px; border-radius: 2px; }
  .grid2 { display: grid; grid-template-columns: 1fr 1fr; gap: 1.25rem; }
  table.heat { border-collapse: collapse; font-size: .75rem; }
  table.heat td, table.heat th { padding: .25rem .4rem; text-align: center; }
  svg { width: 100%; height: auto; }
  svg text { font-size: 10px; fill: #55606b; }
  .error { color: #b00020; }
</style>
</head>
<body>
<header><h1>Smart AQI Dashboard</h1></header>
<main>
  <aside>
    <label for="city">City</label>
    <select id="city"></select>
    <h3>AQI legend</h3>
    <div id="legend"></div>
  </aside>
  <div>
    <section>
      <div class="cards">
        <div class="card" id="predicted-card"><h3>Predicted AQI</h3><div class="value" id="predicted">-</div><div id="predicted-label"></div></div>
        <div class="card" id="live-card"><h3>Live AQI</h3><div class="value" id="live">-</div><div id="live-label"></div></div>
        <div class="card" id="diff-card"><h3>Difference</h3><div class="value" id="difference">-</div></div>
      </div>
      <p id="status" class="error"></p>
      <h3>Health advisory</h3>
      <pre class="advisory" id="advisory"></pre>
    </section>
    <section>
      <h3>Recent trend</h3>
      <div id="trend"></div>
    </section>
    <section>
      <h3>Model analytics</h3>
      <p id="metrics"></p>
      <div class="grid2">
        <div><h4>Model improvement (RMSE)</h4><div id="stages"></div></div>
        <div><h4>Feature importance</h4><div id="importance"></div></div>
      </div>
      <h4>Pollutant correlation</h4>
      <div id="correlation"></div>
      <div class="grid2">
        <div><h4>Average AQI by city</h4><div id="city-average"></div></div>
        <div><h4>AQI distribution</h4><div id="histogram"></div></div>
      </div>
    </section>
  </div>
</main>
<script>
const $ = (id) => document.getElementById(id);
const SVG_NS = "http://www.w3.org/2000/svg";

function el(tag, props = {}, text) {
  const node = document.createElement(tag);
  Object.assign(node, props);
  if (text !== undefined) node.textContent = String(text);
  return node;
}

function svg(tag, attrs = {}, text) {
  const node = document.createElementNS(SVG_NS, tag);
  for (const [k, v] of Object.entries(attrs)) node.setAttribute(k, String(v));
  if (text !== undefined) node.textContent = String(text);
  return node;
}

async function getJson(path) {
  const res = await fetch(path);
  const body = await res.json();
  if (!res.ok) throw new Error(body.error || res.statusText);
  return body;
}

function showError(err) {
  $("status").textContent = err.message;
}

function paint(card, view) {
  card.style.background = view ? view.color : "#8a96a3";
}

function bars(target, rows, label, value) {
  const max = Math.max(...rows.map(value), 1e-9);
  target.replaceChildren(...rows.map((r) => {
    const row = el("div", { className: "bar-row" });
    const bar = el("div", { className: "bar" });
    bar.style.width = `${(value(r) / max) * 55}%`;
    row.append(el("span", { className: "name" }, label(r)), bar, el("span", {}, value(r).toFixed(2)));
    return row;
  }));
}

function lineChart(target, points) {
  const W = 600, H = 200, P = 30;
  const values = points.map((p) => p.aqi).filter((v) => v !== null);
  const root = svg("svg", { viewBox: `0 0 ${W} ${H}` });
  if (!values.length) {
    target.replaceChildren(el("p", {}, "No AQI values recorded"));
    return;
  }
  const lo = Math.min(...values), hi = Math.max(...values);
  const span = hi - lo || 1;
  const x = (i) => P + (i * (W - 2 * P)) / Math.max(points.length - 1, 1);
  const y = (v) => H - P - ((v - lo) / span) * (H - 2 * P);
  const coords = points
    .map((p, i) => (p.aqi === null ? null : `${x(i)},${y(p.aqi)}`))
    .filter((c) => c !== null)
    .join(" ");
  root.append(
    svg("line", { x1: P, y1: H - P, x2: W - P, y2: H - P, stroke: "#ccd" }),
    svg("polyline", { points: coords, fill: "none", stroke: "#4a7bd0", "stroke-width": 2 }),
    svg("text", { x: 2, y: y(hi) + 4 }, Math.round(hi)),
    svg("text", { x: 2, y: y(lo) + 4 }, Math.round(lo)),
    svg("text", { x: P, y: H - 8 }, points[0].date),
    svg("text", { x: W - P, y: H - 8, "text-anchor": "end" }, points[points.length - 1].date),
  );
  target.replaceChildren(root);
}

function histogramChart(target, bins) {
  const W = 400, H = 180, P = 20;
  const max = Math.max(...bins.map((b) => b.count), 1);
  const w = (W - 2 * P) / Math.max(bins.length, 1);
  const root = svg("svg", { viewBox: `0 0 ${W} ${H}` });
  bins.forEach((b, i) => {
    const h = (b.count / max) * (H - 2 * P);
    const rect = svg("rect", { x: P + i * w, y: H - P - h, width: Math.max(w - 1, 1), height: h, fill: "#4a7bd0" });
    rect.append(svg("title", {}, `${b.start.toFixed(1)} to ${b.end.toFixed(1)}: ${b.count}`));
    root.append(rect);
  });
  if (bins.length) {
    root.append(
      svg("text", { x: P, y: H - 4 }, Math.round(bins[0].start)),
      svg("text", { x: W - P, y: H - 4, "text-anchor": "end" }, Math.round(bins[bins.length - 1].end)),
    );
  }
  target.replaceChildren(root);
}

function heatColor(r) {
  if (r === null) return "#eeeeee";
  const a = Math.min(Math.abs(r), 1);
  return r >= 0 ? `rgba(214, 69, 65, ${a})` : `rgba(52, 120, 198, ${a})`;
}

function heatmap(target, matrix) {
  const table = el("table", { className: "heat" });
  const head = el("tr");
  head.append(el("th"), ...matrix.columns.map((c) => el("th", {}, c)));
  table.append(head);
  matrix.values.forEach((row, i) => {
    const tr = el("tr");
    tr.append(el("th", {}, matrix.columns[i]));
    row.forEach((r) => {
      const td = el("td", {}, r === null ? "–" : r.toFixed(2));
      td.style.background = heatColor(r);
      tr.append(td);
    });
    table.append(tr);
  });
  target.replaceChildren(table);
}

async function loadReport(city) {
  $("status").textContent = "";
  try {
    const r = await getJson(`/api/predict?city=${encodeURIComponent(city)}`);
    $("predicted").textContent = r.predicted_aqi;
    $("predicted-label").textContent = r.predicted_category.label;
    paint($("predicted-card"), r.predicted_category);
    $("live").textContent = r.live_aqi ?? "N/A";
    $("live-label").textContent = r.live_category ? r.live_category.label : "Live data unavailable";
    paint($("live-card"), r.live_category);
    $("difference").textContent = r.difference ?? "-";
    $("advisory").textContent = r.advisory_text;
    $("advisory").style.borderColor = r.advisory_tier.color;
    lineChart($("trend"), r.trend);
  } catch (err) {
    showError(err);
  }
}

async function init() {
  const legend = await getJson("/api/legend");
  $("legend").replaceChildren(...legend.map((c) => {
    const row = el("div", { className: "legend-row" });
    const swatch = el("span", { className: "swatch" });
    swatch.style.background = c.color;
    row.append(swatch, document.createTextNode(`${c.label} (${c.range})`));
    return row;
  }));

  const { cities } = await getJson("/api/cities");
  $("city").replaceChildren(...cities.map((c) => el("option", { value: c }, c)));
  $("city").addEventListener("change", (e) => loadReport(e.target.value));
  if (cities.length) loadReport(cities[0]);

  const a = await getJson("/api/analytics");
  $("metrics").textContent = `R² ${a.metrics.r2.toFixed(3)} · RMSE ${a.metrics.rmse.toFixed(2)}`;
  bars($("stages"), a.stage_comparison, (s) => s.stage, (s) => s.rmse);
  bars($("importance"), a.feature_importance, (f) => f.feature, (f) => f.importance);
  heatmap($("correlation"), a.correlation);
  bars($("city-average"), a.city_average, (c) => c.city, (c) => c.mean_aqi);
  histogramChart($("histogram"), a.histogram);
}

init().catch(showError);
</script>
</body>
</html>
"##;
