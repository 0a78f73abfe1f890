/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::error::{SchistError, SchistResult};
use crate::mqtt::PacketType;
use crate::mqtt::utils::{MAXIMUM_BINARY_LENGTH, MAXIMUM_STRING_LENGTH};

use log::*;

pub(crate) fn validate_string_length(value: &str, packet_type: PacketType, function_name: &str, field_name: &str) -> SchistResult<()> {
    if value.len() > MAXIMUM_STRING_LENGTH {
        let message = format!("{} - {} string field too long", function_name, field_name);
        error!("{}", message);
        return Err(SchistError::new_packet_validation(packet_type, message));
    }

    Ok(())
}

pub(crate) fn validate_optional_string_length(optional_string: &Option<String>, packet_type: PacketType, function_name: &str, field_name: &str) -> SchistResult<()> {
    if let Some(value) = optional_string {
        validate_string_length(value, packet_type, function_name, field_name)?;
    }

    Ok(())
}

pub(crate) fn validate_binary_length(value: &[u8], packet_type: PacketType, function_name: &str, field_name: &str) -> SchistResult<()> {
    if value.len() > MAXIMUM_BINARY_LENGTH {
        let message = format!("{} - {} binary field too long", function_name, field_name);
        error!("{}", message);
        return Err(SchistError::new_packet_validation(packet_type, message));
    }

    Ok(())
}

pub(crate) fn validate_optional_binary_length(optional_data: &Option<Vec<u8>>, packet_type: PacketType, function_name: &str, field_name: &str) -> SchistResult<()> {
    if let Some(value) = optional_data {
        validate_binary_length(value, packet_type, function_name, field_name)?;
    }

    Ok(())
}

/// Topic names used for publishing may not be empty and may not contain wildcards
pub(crate) fn is_valid_topic(topic: &str) -> bool {
    if topic.is_empty() || topic.len() > MAXIMUM_STRING_LENGTH {
        return false;
    }

    if topic.contains(['#', '+']) {
        return false;
    }

    true
}

/// Checks filter syntax only.  '+' must occupy a whole level and '#' must occupy the whole final level.
pub(crate) fn is_valid_topic_filter(filter: &str) -> bool {
    if filter.is_empty() || filter.len() > MAXIMUM_STRING_LENGTH {
        return false;
    }

    let mut seen_mlw = false;
    for segment in filter.split('/') {
        if seen_mlw {
            return false;
        }

        if segment.len() == 1 {
            if segment == "#" {
                seen_mlw = true;
            }
        } else if segment.contains(['#', '+']) {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_validation() {
        assert!(is_valid_topic("a/b/c"));
        assert!(is_valid_topic("/"));
        assert!(!is_valid_topic(""));
        assert!(!is_valid_topic("a/+/c"));
        assert!(!is_valid_topic("a/#"));
    }

    #[test]
    fn topic_filter_validation() {
        assert!(is_valid_topic_filter("a/b/c"));
        assert!(is_valid_topic_filter("a/+/c"));
        assert!(is_valid_topic_filter("#"));
        assert!(is_valid_topic_filter("a/#"));
        assert!(is_valid_topic_filter("+"));
        assert!(!is_valid_topic_filter(""));
        assert!(!is_valid_topic_filter("a/#/c"));
        assert!(!is_valid_topic_filter("a/b#"));
        assert!(!is_valid_topic_filter("a/+b/c"));
    }

    #[test]
    fn string_length_validation() {
        let long_string = "a".repeat(MAXIMUM_STRING_LENGTH + 1);
        assert!(validate_string_length("ok", PacketType::Publish, "test", "topic").is_ok());
        assert!(validate_string_length(&long_string, PacketType::Publish, "test", "topic").is_err());
        assert!(validate_optional_string_length(&None, PacketType::Connect, "test", "username").is_ok());
    }
}
