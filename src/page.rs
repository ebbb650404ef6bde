//! The single-page UI served at `GET /`.
//!
//! Plain HTML and inline JS against the JSON API; no build step.

pub const INDEX_HTML: &str = r##"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>NLQ Engine</title>
<style>
  body { font-family: system-ui, sans-serif; margin: 2rem auto; max-width: 960px; color: #222; }
  h1 { font-size: 1.4rem; }
  section { border: 1px solid #ddd; border-radius: 6px; padding: 1rem; margin-bottom: 1rem; }
  pre { background: #f6f8fa; padding: .75rem; overflow: auto; max-height: 420px; }
  input[type=text] { width: 70%; padding: .4rem; }
  button { padding: .4rem .8rem; }
  .muted { color: #777; font-size: .9rem; }
  table { border-collapse: collapse; }
  td, th { border: 1px solid #ddd; padding: .2rem .5rem; font-size: .9rem; text-align: left; }
</style>
</head>
<body>
<h1>NLQ Engine</h1>

<section>
  <h2>Ask</h2>
  <form id="ask">
    <input type="text" id="q" placeholder="How many employees do we have?" autofocus>
    <button type="submit">Ask</button>
  </form>
  <p class="muted" id="timing"></p>
  <pre id="result">{}</pre>
</section>

<section>
  <h2>Documents</h2>
  <input type="file" id="file" accept=".txt,.csv,.md" multiple>
  <button id="upload">Upload</button>
  <ul id="docs"></ul>
</section>

<section>
  <h2>Schema</h2>
  <div id="schema" class="muted">loading...</div>
</section>

<script>
async function api(method, path, body) {
  const res = await fetch(path, {
    method,
    headers: body ? { "Content-Type": "application/json" } : {},
    body: body ? JSON.stringify(body) : undefined,
  });
  const data = await res.json();
  if (!res.ok) throw new Error(data.error ? data.error.message : res.statusText);
  return data;
}

async function loadSchema() {
  const schema = await api("GET", "/api/schema");
  const el = document.getElementById("schema");
  el.innerHTML = "";
  for (const [name, table] of Object.entries(schema.tables)) {
    const t = document.createElement("table");
    const cap = t.createCaption();
    cap.textContent = name;
    for (const col of table.columns) {
      const row = t.insertRow();
      row.insertCell().textContent = col.name;
      row.insertCell().textContent = col.type + (col.primary_key ? " (pk)" : "");
    }
    el.appendChild(t);
  }
}

async function loadDocs() {
  const data = await api("GET", "/api/documents");
  const ul = document.getElementById("docs");
  ul.innerHTML = "";
  for (const d of data.documents) {
    const li = document.createElement("li");
    li.textContent = d.filename + " (" + d.kind + ", " + d.bytes + " bytes)";
    ul.appendChild(li);
  }
}

function toBase64(buffer) {
  let binary = "";
  const bytes = new Uint8Array(buffer);
  for (let i = 0; i < bytes.length; i++) binary += String.fromCharCode(bytes[i]);
  return btoa(binary);
}

document.getElementById("ask").addEventListener("submit", async (e) => {
  e.preventDefault();
  const query = document.getElementById("q").value;
  const started = performance.now();
  try {
    const result = await api("POST", "/api/query", { query });
    const rtt = (performance.now() - started).toFixed(1);
    document.getElementById("timing").textContent =
      "engine " + result.elapsed_ms.toFixed(2) + " ms, round trip " + rtt + " ms" +
      (result.cache_hit ? " (cached)" : "");
    document.getElementById("result").textContent = JSON.stringify(result, null, 2);
  } catch (err) {
    document.getElementById("result").textContent = String(err);
  }
});

document.getElementById("upload").addEventListener("click", async () => {
  for (const file of document.getElementById("file").files) {
    const content_base64 = toBase64(await file.arrayBuffer());
    try {
      await api("POST", "/api/documents", { filename: file.name, content_base64 });
    } catch (err) {
      alert(file.name + ": " + err.message);
    }
  }
  loadDocs();
});

loadSchema();
loadDocs();
</script>
</body>
</html>
"##;
