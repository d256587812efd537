//! # Integration User Configurations
//!
//! Sparse per-integration-type settings. Every field is optional so that an
//! unset value is never sent to the provider.

use crate::controller::user_config::{Field, UserConfig};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Datadog integration settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatadogUserConfig {
    /// Enable Datadog Database Monitoring
    #[serde(default)]
    pub datadog_dbm_enabled: Option<bool>,
    /// Consumer groups to exclude
    #[serde(default)]
    pub exclude_consumer_groups: Option<Vec<String>>,
    /// Topics to exclude
    #[serde(default)]
    pub exclude_topics: Option<Vec<String>>,
    /// Consumer groups to include
    #[serde(default)]
    pub include_consumer_groups: Option<Vec<String>>,
    /// Topics to include
    #[serde(default)]
    pub include_topics: Option<Vec<String>>,
    /// Additional Kafka metrics to collect
    #[serde(default)]
    pub kafka_custom_metrics: Option<Vec<String>>,
    /// Maximum number of JMX metrics to send
    #[serde(default)]
    pub max_jmx_metrics: Option<i64>,
}

impl UserConfig for DatadogUserConfig {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::optional("datadog_dbm_enabled", &self.datadog_dbm_enabled),
            Field::optional("exclude_consumer_groups", &self.exclude_consumer_groups),
            Field::optional("exclude_topics", &self.exclude_topics),
            Field::optional("include_consumer_groups", &self.include_consumer_groups),
            Field::optional("include_topics", &self.include_topics),
            Field::optional("kafka_custom_metrics", &self.kafka_custom_metrics),
            Field::optional("max_jmx_metrics", &self.max_jmx_metrics),
        ]
    }
}

/// Kafka Connect integration settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KafkaConnectUserConfig {
    #[serde(default)]
    pub kafka_connect: Option<KafkaConnectSettings>,
}

impl UserConfig for KafkaConnectUserConfig {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![Field::nested("kafka_connect", &self.kafka_connect)]
    }
}

/// Topics and group used by a Kafka Connect cluster
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KafkaConnectSettings {
    /// Topic storing connector configurations
    #[serde(default)]
    pub config_storage_topic: Option<String>,
    /// Kafka Connect consumer group
    #[serde(default)]
    pub group_id: Option<String>,
    /// Topic storing connector offsets
    #[serde(default)]
    pub offset_storage_topic: Option<String>,
    /// Topic storing connector status
    #[serde(default)]
    pub status_storage_topic: Option<String>,
}

impl UserConfig for KafkaConnectSettings {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::optional("config_storage_topic", &self.config_storage_topic),
            Field::optional("group_id", &self.group_id),
            Field::optional("offset_storage_topic", &self.offset_storage_topic),
            Field::optional("status_storage_topic", &self.status_storage_topic),
        ]
    }
}

/// Kafka logs integration settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KafkaLogsUserConfig {
    /// Topic receiving the service logs
    #[serde(default)]
    pub kafka_topic: Option<String>,
}

impl UserConfig for KafkaLogsUserConfig {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![Field::optional("kafka_topic", &self.kafka_topic)]
    }
}

/// Metrics integration settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricsUserConfig {
    /// Database storing the metrics
    #[serde(default)]
    pub database: Option<String>,
    /// Days to keep metrics
    #[serde(default)]
    pub retention_days: Option<i64>,
    /// Read-only user for the metrics database
    #[serde(default)]
    pub ro_username: Option<String>,
    /// Read-write user for the metrics database
    #[serde(default)]
    pub username: Option<String>,
    /// Extra metrics collected from a MySQL source
    #[serde(default)]
    pub source_mysql: Option<SourceMysql>,
}

impl UserConfig for MetricsUserConfig {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::optional("database", &self.database),
            Field::optional("retention_days", &self.retention_days),
            Field::optional("ro_username", &self.ro_username),
            Field::optional("username", &self.username),
            Field::nested("source_mysql", &self.source_mysql),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SourceMysql {
    #[serde(default)]
    pub telegraf: Option<TelegrafSettings>,
}

impl UserConfig for SourceMysql {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![Field::nested("telegraf", &self.telegraf)]
    }
}

/// Telegraf MySQL input settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TelegrafSettings {
    #[serde(default)]
    pub gather_event_waits: Option<bool>,
    #[serde(default)]
    pub gather_file_events_stats: Option<bool>,
    #[serde(default)]
    pub gather_index_io_waits: Option<bool>,
    #[serde(default)]
    pub gather_info_schema_auto_inc: Option<bool>,
    #[serde(default)]
    pub gather_innodb_metrics: Option<bool>,
    #[serde(default)]
    pub gather_perf_events_statements: Option<bool>,
    #[serde(default)]
    pub gather_process_list: Option<bool>,
    #[serde(default)]
    pub gather_slave_status: Option<bool>,
    #[serde(default)]
    pub gather_table_io_waits: Option<bool>,
    #[serde(default)]
    pub gather_table_lock_waits: Option<bool>,
    #[serde(default)]
    pub gather_table_schema: Option<bool>,
    #[serde(default)]
    pub perf_events_statements_digest_text_limit: Option<i64>,
    #[serde(default)]
    pub perf_events_statements_limit: Option<i64>,
    #[serde(default)]
    pub perf_events_statements_time_limit: Option<i64>,
}

impl UserConfig for TelegrafSettings {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::optional("gather_event_waits", &self.gather_event_waits),
            Field::optional("gather_file_events_stats", &self.gather_file_events_stats),
            Field::optional("gather_index_io_waits", &self.gather_index_io_waits),
            Field::optional(
                "gather_info_schema_auto_inc",
                &self.gather_info_schema_auto_inc,
            ),
            Field::optional("gather_innodb_metrics", &self.gather_innodb_metrics),
            Field::optional(
                "gather_perf_events_statements",
                &self.gather_perf_events_statements,
            ),
            Field::optional("gather_process_list", &self.gather_process_list),
            Field::optional("gather_slave_status", &self.gather_slave_status),
            Field::optional("gather_table_io_waits", &self.gather_table_io_waits),
            Field::optional("gather_table_lock_waits", &self.gather_table_lock_waits),
            Field::optional("gather_table_schema", &self.gather_table_schema),
            Field::optional(
                "perf_events_statements_digest_text_limit",
                &self.perf_events_statements_digest_text_limit,
            ),
            Field::optional(
                "perf_events_statements_limit",
                &self.perf_events_statements_limit,
            ),
            Field::optional(
                "perf_events_statements_time_limit",
                &self.perf_events_statements_time_limit,
            ),
        ]
    }
}
