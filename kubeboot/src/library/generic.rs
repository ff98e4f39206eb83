pub(super) const FRAGMENTS: &[(&str, &str)] = &[
    ("fullScript", FULL_SCRIPT),
    ("preloadedScript", PRELOADED_SCRIPT),
    ("generatePreloadedImage", GENERATE_PRELOADED_IMAGE),
    ("startScript", START_SCRIPT),
    ("endScript", END_SCRIPT),
];

const FULL_SCRIPT: &str = r#"
{{- template "startScript" }}
{{ template "install" }}
{{ template "configure" }}
{{- template "endScript" -}}
"#;

const PRELOADED_SCRIPT: &str = r#"
{{- template "startScript" }}
{{ template "configure" }}
{{- template "endScript" -}}
"#;

const GENERATE_PRELOADED_IMAGE: &str = r#"
{{- template "startScript" }}
{{ template "install" }}

systemctl enable docker || true
systemctl start docker || true

{{ range .Images }}docker pull {{ . }}
{{ end }}
{{- template "endScript" -}}
"#;

const START_SCRIPT: &str = r#"#!/bin/bash

set -e
set -x

("#;

const END_SCRIPT: &str = r#"
echo done.
) 2>&1 | tee /var/log/startup.log
"#;
