/// Sizing knobs for the delivery pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Number of delivered chunks buffered before deliveries are rejected.
    pub input_chunks: usize,
    /// Capacity of the sample buffer handed to the device per write.
    pub output_buffer_samples: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_chunks: 8,
            output_buffer_samples: 8192,
        }
    }
}

impl PipelineConfig {
    /// Clamp both sizes to at least one so the queue and buffer are usable.
    pub fn normalized(self) -> Self {
        Self {
            input_chunks: self.input_chunks.max(1),
            output_buffer_samples: self.output_buffer_samples.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_decoder_expectations() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.input_chunks, 8);
        assert_eq!(cfg.output_buffer_samples, 8192);
    }

    #[test]
    fn normalized_rejects_zero_sizes() {
        let cfg = PipelineConfig {
            input_chunks: 0,
            output_buffer_samples: 0,
        }
        .normalized();
        assert_eq!(cfg.input_chunks, 1);
        assert_eq!(cfg.output_buffer_samples, 1);
    }
}
