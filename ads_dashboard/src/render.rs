//! HTML and terminal rendering of the dashboard view.

use std::fmt::Write as _;

use serde::Serialize;

use ads_core::{AdRecord, Totals};

use crate::state::ViewState;

/// Everything the page script needs, embedded as JSON.
#[derive(Debug, Serialize)]
struct PageData<'a> {
    state: &'static str,
    error: Option<&'a str>,
    notice: Option<&'a str>,
    account_id: Option<&'a str>,
    generated_at: &'a str,
    totals: Option<Totals>,
    ads: &'a [AdRecord],
}

pub struct RenderContext<'a> {
    pub notice: Option<&'a str>,
    pub account_id: Option<&'a str>,
    pub generated_at: &'a str,
}

/// JSON is placed inside a `<script>` element, so no markup character may
/// appear literally. They only occur inside JSON strings, where the `\u`
/// escapes decode to the same text.
fn embed_json(json: &str) -> String {
    json.replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

pub fn render_html(view: &ViewState, ctx: &RenderContext<'_>) -> Result<String, serde_json::Error> {
    let error = match view {
        ViewState::Error(message) => Some(message.as_str()),
        _ => None,
    };
    let data = PageData {
        state: view.name(),
        error,
        notice: ctx.notice,
        account_id: ctx.account_id,
        generated_at: ctx.generated_at,
        totals: Totals::from_records(view.records()),
        ads: view.records(),
    };
    let json_data = embed_json(&serde_json::to_string(&data)?);

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Meta Ads Dashboard</title>
    <style>
        * {{ box-sizing: border-box; }}
        body {{ font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; margin: 0; padding: 20px; background: #f5f5f5; }}
        .container {{ max-width: 1400px; margin: 0 auto; }}
        h1 {{ color: #333; margin-bottom: 10px; }}
        .meta {{ color: #666; margin-bottom: 20px; font-size: 14px; }}

        .summary-dashboard {{ display: grid; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); gap: 15px; margin-bottom: 25px; }}
        .metric-card {{ background: white; padding: 20px; border-radius: 8px; box-shadow: 0 1px 3px rgba(0,0,0,0.1); text-align: center; }}
        .metric-value {{ font-size: 2rem; font-weight: 700; color: #333; }}
        .metric-label {{ font-size: 0.85rem; color: #666; margin-top: 5px; text-transform: uppercase; letter-spacing: 0.5px; }}

        .ads-grid {{ display: grid; grid-template-columns: repeat(auto-fill, minmax(260px, 1fr)); gap: 15px; }}
        .ad-card {{ background: white; border-radius: 8px; overflow: hidden; box-shadow: 0 1px 3px rgba(0,0,0,0.1); }}
        .ad-image {{ width: 100%; height: 180px; object-fit: cover; background: #e9ecef; display: block; }}
        .ad-placeholder {{ width: 100%; height: 180px; background: #e9ecef; color: #999; display: flex; align-items: center; justify-content: center; font-size: 0.85rem; }}
        .ad-body {{ padding: 15px; }}
        .ad-name {{ font-weight: 600; color: #333; margin: 0 0 8px 0; }}
        .ad-stats {{ width: 100%; font-size: 0.85rem; }}
        .ad-stats td {{ padding: 3px 0; color: #666; }}
        .ad-stats td:last-child {{ text-align: right; color: #333; }}
        .spend {{ color: #4a90a4; font-weight: 600; }}

        .badge {{ display: inline-block; padding: 2px 8px; border-radius: 4px; font-size: 12px; margin-left: 5px; }}
        .badge-success {{ background: #d4edda; color: #155724; }}
        .badge-warning {{ background: #fff3cd; color: #856404; }}

        .error-box {{ background: #fff5f5; border: 1px solid #ffcccc; border-radius: 8px; padding: 20px; margin-bottom: 25px; color: #dc3545; }}
        .hint {{ background: white; border-radius: 8px; padding: 20px; box-shadow: 0 1px 3px rgba(0,0,0,0.1); color: #666; }}
        .hint code {{ background: #f0f0f0; padding: 2px 6px; border-radius: 4px; }}

        footer {{ margin-top: 40px; padding: 20px; text-align: center; color: #666; font-size: 12px; border-top: 1px solid #ddd; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>Meta Ads Dashboard</h1>
        <div class="meta" id="meta"></div>
        <div id="errors"></div>
        <div class="summary-dashboard" id="kpis"></div>
        <div class="ads-grid" id="ads"></div>
    </div>
    <script>
        const DASHBOARD = {json_data};

        function el(tag, className, text) {{
            const node = document.createElement(tag);
            if (className) node.className = className;
            if (text !== undefined) node.textContent = text;
            return node;
        }}

        const fmtInt = n => Math.trunc(n || 0).toLocaleString();
        const fmtMoney = n => '$' + (n || 0).toFixed(2);

        function renderMeta() {{
            const parts = ['Generated ' + DASHBOARD.generated_at];
            if (DASHBOARD.account_id) parts.push('Account ' + DASHBOARD.account_id);
            document.getElementById('meta').textContent = parts.join(' | ');
        }}

        function renderErrors() {{
            const box = document.getElementById('errors');
            [DASHBOARD.notice, DASHBOARD.error].filter(Boolean).forEach(msg => {{
                box.appendChild(el('div', 'error-box', msg));
            }});
            if (DASHBOARD.state === 'unconfigured') {{
                const hint = el('div', 'hint');
                hint.appendChild(document.createTextNode('Not configured. Run '));
                hint.appendChild(el('code', null, 'ads_dashboard login --token <TOKEN> --account-id <ID>'));
                hint.appendChild(document.createTextNode(' to connect an ad account.'));
                box.appendChild(hint);
            }}
        }}

        function renderKpis() {{
            const t = DASHBOARD.totals;
            if (!t) return;
            const kpis = document.getElementById('kpis');
            [
                ['Total Reach', fmtInt(t.reach)],
                ['Impressions', fmtInt(t.impressions)],
                ['Average CPC', fmtMoney(t.avg_cpc)],
                ['Total Spend', fmtMoney(t.spend)],
            ].forEach(([label, value]) => {{
                const card = el('div', 'metric-card');
                card.appendChild(el('div', 'metric-value', value));
                card.appendChild(el('div', 'metric-label', label));
                kpis.appendChild(card);
            }});
        }}

        function renderAds() {{
            const grid = document.getElementById('ads');
            DASHBOARD.ads.forEach(ad => {{
                const card = el('div', 'ad-card');
                if (ad.image_url) {{
                    const img = el('img', 'ad-image');
                    img.src = ad.image_url;
                    img.alt = ad.ad_name;
                    img.loading = 'lazy';
                    card.appendChild(img);
                }} else {{
                    card.appendChild(el('div', 'ad-placeholder', 'No image'));
                }}

                const body = el('div', 'ad-body');
                const name = el('p', 'ad-name', ad.ad_name || 'Unnamed');
                const status = ad.effective_status || ad.status;
                if (status) {{
                    name.appendChild(el('span', 'badge ' + (status === 'ACTIVE' ? 'badge-success' : 'badge-warning'), status));
                }}
                body.appendChild(name);

                const stats = el('table', 'ad-stats');
                [
                    ['Reach', fmtInt(ad.reach)],
                    ['Impressions', fmtInt(ad.impressions)],
                    ['CPC', fmtMoney(ad.cpc)],
                    ['Clicks', fmtInt(ad.clicks)],
                    ['Spend', fmtMoney(ad.spend)],
                ].forEach(([label, value]) => {{
                    const tr = el('tr');
                    tr.appendChild(el('td', null, label));
                    tr.appendChild(el('td', label === 'Spend' ? 'spend' : null, value));
                    stats.appendChild(tr);
                }});
                body.appendChild(stats);
                card.appendChild(body);
                grid.appendChild(card);
            }});
        }}

        renderMeta();
        renderErrors();
        renderKpis();
        renderAds();
    </script>
    <footer>
        <p>Meta Ads Dashboard</p>
    </footer>
</body>
</html>"#,
        json_data = json_data,
    ))
}

/// `1234567` -> `1,234,567`
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn render_text(view: &ViewState, notice: Option<&str>) -> String {
    let mut out = String::new();

    if let Some(notice) = notice {
        let _ = writeln!(out, "! {notice}");
    }

    match view {
        ViewState::Unconfigured => {
            out.push_str("Not configured. Run `ads_dashboard login --token <TOKEN> --account-id <ID>`.\n");
        }
        ViewState::Idle => out.push_str("Ready. Nothing loaded yet.\n"),
        ViewState::Loading => out.push_str("Loading...\n"),
        ViewState::Error(message) => {
            let _ = writeln!(out, "Error: {message}");
        }
        ViewState::Loaded(records) => {
            if let Some(t) = Totals::from_records(records) {
                let _ = writeln!(out, "Total reach:  {}", group_thousands(t.reach));
                let _ = writeln!(out, "Impressions:  {}", group_thousands(t.impressions));
                let _ = writeln!(out, "Average CPC:  ${:.2}", t.avg_cpc);
                let _ = writeln!(out, "Total spend:  ${:.2}", t.spend);
                out.push('\n');
            }

            let _ = writeln!(
                out,
                "{:<40} {:<8} {:>12} {:>12} {:>8} {:>8} {:>10}",
                "AD", "STATUS", "REACH", "IMPRESSIONS", "CLICKS", "CPC", "SPEND"
            );
            for ad in records {
                let status = ad.current_status().map(|s| s.as_str()).unwrap_or("-");
                let name: String = if ad.ad_name.is_empty() {
                    "Unnamed".to_string()
                } else {
                    ad.ad_name.chars().take(40).collect()
                };
                let _ = writeln!(
                    out,
                    "{:<40} {:<8} {:>12} {:>12} {:>8} {:>8} {:>10}",
                    name,
                    status,
                    group_thousands(ad.reach),
                    group_thousands(ad.impressions),
                    group_thousands(ad.clicks),
                    format!("${:.2}", ad.cpc),
                    format!("${:.2}", ad.spend),
                );
            }
        }
    }

    out
}
