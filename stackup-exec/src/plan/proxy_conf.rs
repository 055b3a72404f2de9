use stackup_core::StackConfig;

/// Renders the nginx server block: `/api/` goes to the API, everything else to the frontend.
pub fn render_proxy_config(config: &StackConfig) -> String {
    let proxy = &config.proxy;
    format!(
        r#"# Managed by stackup for project {project}. Local edits are overwritten.
upstream {project}_api {{
    server {api_upstream};
}}

upstream {project}_frontend {{
    server {frontend_upstream};
}}

server {{
    listen {port};
    server_name {server_name};

    location /api/ {{
        proxy_pass http://{project}_api;
{headers}    }}

    location / {{
        proxy_pass http://{project}_frontend;
{headers}    }}
}}
"#,
        project = config.project,
        api_upstream = proxy.api_upstream,
        frontend_upstream = proxy.frontend_upstream,
        port = proxy.listen_port,
        server_name = proxy.server_name,
        headers = FORWARD_HEADERS,
    )
}

const FORWARD_HEADERS: &str = "        proxy_set_header Host $host;
        proxy_set_header X-Real-IP $remote_addr;
        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;
        proxy_set_header X-Forwarded-Proto $scheme;
";
