use fitscore_core::domain::sample::Channel;

const DAY_OPTIONS: [usize; 3] = [7, 14, 30];

pub fn render_index(display_days: usize) -> String {
    let mut day_options: Vec<usize> = DAY_OPTIONS.to_vec();
    if !day_options.contains(&display_days) {
        day_options.push(display_days);
        day_options.sort_unstable();
    }

    let days_html: String = day_options
        .iter()
        .map(|d| {
            let selected = if *d == display_days { " selected" } else { "" };
            format!(r#"<option value="{d}"{selected}>Last {d} days</option>"#)
        })
        .collect::<Vec<_>>()
        .join("\n          ");

    let mut series_html =
        vec![r#"<option value="score" selected>Composite score</option>"#.to_string()];
    for channel in Channel::ALL {
        series_html.push(format!(
            r#"<option value="{channel}">{channel} ({})</option>"#,
            channel.unit()
        ));
    }

    INDEX_HTML
        .replace("{{DAY_OPTIONS}}", &days_html)
        .replace("{{SERIES_OPTIONS}}", &series_html.join("\n          "))
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Wellness Score</title>
  <script src="https://cdn.jsdelivr.net/npm/chart.js@4"></script>
  <script src="https://cdn.jsdelivr.net/npm/chartjs-plugin-datalabels@2"></script>
  <style>
    body {
      margin: 0;
      min-height: 100vh;
      background: #f4f6f8;
      color: #1f2933;
      font-family: "Helvetica Neue", Arial, sans-serif;
      display: grid;
      place-items: center;
      padding: 24px;
    }

    .app {
      width: min(900px, 100%);
      background: #fff;
      border-radius: 16px;
      box-shadow: 0 12px 40px rgba(31, 41, 51, 0.12);
      padding: 28px;
      display: grid;
      gap: 18px;
    }

    header {
      display: flex;
      flex-wrap: wrap;
      justify-content: space-between;
      align-items: center;
      gap: 12px;
    }

    h1 {
      margin: 0;
      font-size: 1.6rem;
    }

    .controls {
      display: flex;
      gap: 10px;
    }

    select, button {
      font: inherit;
      padding: 6px 10px;
      border-radius: 8px;
      border: 1px solid #cbd2d9;
      background: #fff;
    }

    #status {
      margin: 0;
      min-height: 1.2em;
      color: #616e7c;
    }

    #status.error {
      color: #c92a2a;
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <h1>Wellness Score</h1>
      <div class="controls">
        <select id="daysSelector" aria-label="Days to display">
          {{DAY_OPTIONS}}
        </select>
        <select id="seriesSelector" aria-label="Series">
          {{SERIES_OPTIONS}}
        </select>
        <button id="logout" type="button">Sign out</button>
      </div>
    </header>
    <p id="status"></p>
    <canvas id="scoreChart" height="120"></canvas>
  </main>

  <script>
    const daysEl = document.getElementById('daysSelector');
    const seriesEl = document.getElementById('seriesSelector');
    const statusEl = document.getElementById('status');
    let chart = null;

    const setStatus = (text, isError) => {
      statusEl.textContent = text;
      statusEl.classList.toggle('error', Boolean(isError));
    };

    const render = (payload) => {
      const labels = payload.points.map((p) => p.label);
      const values = payload.points.map((p) => p.value);
      if (chart) {
        chart.destroy();
      }
      chart = new Chart(document.getElementById('scoreChart').getContext('2d'), {
        type: 'line',
        data: {
          labels,
          datasets: [{
            label: payload.label,
            data: values,
            borderColor: '#3e95cd',
            fill: false,
            spanGaps: false,
            pointBackgroundColor: '#000',
            pointRadius: 6,
            pointHoverRadius: 8,
            pointStyle: 'circle',
          }],
        },
        options: {
          plugins: {
            datalabels: {
              color: '#fff',
              backgroundColor: '#000',
              borderRadius: 4,
              font: { weight: 'bold' },
              formatter: (value) => (value === null ? '' : Number(value).toFixed(1)),
            },
          },
          scales: {
            x: { ticks: { color: 'black' } },
            y: { ticks: { color: 'black' } },
          },
        },
        plugins: [ChartDataLabels],
      });
    };

    const load = async () => {
      setStatus('Loading…');
      const params = new URLSearchParams({ days: daysEl.value, series: seriesEl.value });
      try {
        const res = await fetch(`/api/chart?${params}`);
        const body = await res.json().catch(() => ({}));
        if (res.status === 401) {
          window.location.href = body.authorize_url || '/authorize';
          return;
        }
        if (!res.ok) {
          setStatus(body.detail || `Request failed (${res.status})`, true);
          return;
        }
        render(body);
        setStatus(`${body.range.start} – ${body.range.end}`);
      } catch (err) {
        setStatus(`Request failed: ${err}`, true);
      }
    };

    daysEl.addEventListener('change', load);
    seriesEl.addEventListener('change', load);
    document.getElementById('logout').addEventListener('click', async () => {
      await fetch('/logout', { method: 'POST' });
      window.location.href = '/authorize';
    });

    load();
  </script>
</body>
</html>
"#;
