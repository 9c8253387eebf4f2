pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# UPMON CONFIGURATION
# =============================================================================
# upmon runs the external data-transfer client once per monitored entity,
# classifies the run log it produces, notifies the configured targets, and
# archives a severity-filtered copy of the log for audit.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/upmon/config.yml
#   3. /etc/upmon/config.yml

# The external client. Invoked as:
#   <binary> --config <entity config_ref> --mode <run mode> --log-level trace <extra_args...>
# stdout and stderr are captured into the per-entity working log.
client:
  binary: /usr/local/bin/mf-client
  # Bound on one invocation; the client is killed on expiry.
  timeout: 23h
  extra_args: []

# Ordered entity list. One record per line:
#   <config_ref> <name> <run_mode>
# run_mode is one of: data, metadata, scan-only
# Blank lines and '#' comments are ignored; malformed records are skipped
# with a warning.
entities: /etc/upmon/entities.list

run:
  # Per-entity working logs, overwritten each run. The archive below is the
  # durable record, not these files.
  log_dir: /var/log/upmon/runs
  # A log artifact older than this is untrustworthy and classifies the run
  # as indeterminate without being read.
  staleness_window: 23h
  # Concurrent entity pipelines. With more than 1, client invocations still
  # serialize over the shared remote mount unless serialize_client is off.
  max_concurrency: 1
  serialize_client: true

# Client log line layout: `<date> <time> <LEVEL> <module> <message...>`.
parser:
  severity_column: 2
  # Case-insensitive substring marking a "new data created" event.
  data_marker: '- creating'

archive:
  # One ERROR/WARN/INFO-only artifact per entity per calendar day.
  dir: /var/log/upmon/archive

notify:
  email:
    smtp_host: localhost
    smtp_port: 25
    starttls: false
    from: upmon@example.org
  chat:
    webhook_url: '$env{UPMON_CHAT_WEBHOOK}'
    max_inline_bytes: 3000
  # Each target receives only the outcome statuses it lists.
  targets:
    - channel: email
      address: ops@example.org
      statuses: [error, indeterminate]
    - channel: chat
      address: '#upload-digest'
      statuses: [clean, data_found]
      # Attach the cleaned daily archive to digest deliveries.
      attach_archive: true
  # Faults in the monitoring itself (bad entity records, stale artifacts,
  # delivery blackouts) go here, never to the per-run targets.
  operator:
    channel: email
    address: upmon-dev@example.org
    statuses: [indeterminate]
"#
    .to_string()
}
