use ferrous_tap_application::use_cases::DispatchRecordUseCase;
use ferrous_tap_application::IngestStats;
use ferrous_tap_domain::{Config, WireType};
use ferrous_tap_infrastructure::dnstap::{
    DnstapDecoder, HickoryDnsMessageParser, JsonLinesConsumer,
};
use ferrous_tap_infrastructure::protobuf::WireDecoder;
use ferrous_tap_infrastructure::server::{ConnectionSettings, ContentTypePolicy, TapListener};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace};

/// Decoder, consumer and listener settings built from one configuration.
pub struct Pipeline {
    dispatch: Arc<DispatchRecordUseCase>,
    settings: ConnectionSettings,
    content_types: ContentTypePolicy,
    socket_path: String,
    remove_stale_socket: bool,
}

impl Pipeline {
    pub fn new(config: &Config) -> Self {
        let mut wire = WireDecoder::new();
        if config.ingest.trace_wire_types {
            wire = wire.with_observer(Arc::new(log_wire_tag));
        }

        let consumer = JsonLinesConsumer::new(
            std::io::stdout(),
            Arc::new(HickoryDnsMessageParser::new()),
        )
        .with_message_types(config.output.message_types.iter().cloned())
        .with_pretty(config.output.pretty);

        let dispatch = Arc::new(DispatchRecordUseCase::new(
            Arc::new(DnstapDecoder::new(wire)),
            Arc::new(consumer),
            Arc::new(IngestStats::new()),
        ));

        info!(
            dispatch_mode = ?config.ingest.dispatch_mode,
            content_type = config.ingest.expected_content_type().unwrap_or("<first offer>"),
            scope = ?config.ingest.content_type_scope,
            "Pipeline configured"
        );

        Self {
            dispatch,
            settings: ConnectionSettings::from_config(config),
            content_types: ContentTypePolicy::from_config(&config.ingest),
            socket_path: config.server.socket_path.clone(),
            remove_stale_socket: config.server.remove_stale_socket,
        }
    }

    pub fn listen(self, shutdown: CancellationToken) -> std::io::Result<TapListener> {
        let listener = TapListener::bind(
            &self.socket_path,
            self.remove_stale_socket,
            self.settings,
            self.dispatch,
            self.content_types,
        )?;
        Ok(listener.with_cancellation(shutdown))
    }
}

fn log_wire_tag(schema: &'static str, field_id: u32, wire_type: WireType, name: Option<&'static str>) {
    trace!(
        schema,
        field_id,
        wire_type = wire_type.as_str(),
        field = name.unwrap_or("<unknown>"),
        "Wire tag"
    );
}
