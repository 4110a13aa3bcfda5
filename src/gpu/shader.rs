//! WGSL templating and compilation.
//!
//! Kernel sources carry `{{NAME}}` placeholders for values fixed at startup
//! (workgroup size, storage texture format). Every rendered source is parsed
//! and validated with naga before it reaches the device, so a broken kernel
//! surfaces as a [`KernelError`] instead of a device-lost callback.

use wgpu::{Device, ShaderModule, TextureFormat};

/// YCbCr → RGB conversion kernel source.
pub const YCBCR_CONVERT_WGSL: &str = include_str!("shaders/ycbcr_convert.wgsl");

/// Single-direction Gaussian blur kernel source.
pub const GAUSSIAN_BLUR_WGSL: &str = include_str!("shaders/gaussian_blur.wgsl");

/// Errors that can occur while building a compute kernel.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error("Shader '{label}' has an unresolved placeholder {placeholder}")]
    UnresolvedPlaceholder { label: String, placeholder: String },
    #[error("Shader '{label}' failed to parse:\n{message}")]
    Parse { label: String, message: String },
    #[error("Shader '{label}' failed validation:\n{message}")]
    Validation { label: String, message: String },
    #[error("Texture format {0:?} cannot be written from a compute kernel")]
    UnsupportedStorageFormat(TextureFormat),
}

/// WGSL spelling of a storage texture format.
pub fn storage_format_name(format: TextureFormat) -> Result<&'static str, KernelError> {
    match format {
        TextureFormat::Rgba8Unorm => Ok("rgba8unorm"),
        TextureFormat::Bgra8Unorm => Ok("bgra8unorm"),
        TextureFormat::Rgba16Float => Ok("rgba16float"),
        other => Err(KernelError::UnsupportedStorageFormat(other)),
    }
}

/// A WGSL source with `{{NAME}}` placeholders.
#[derive(Debug, Clone, Copy)]
pub struct ShaderTemplate {
    label: &'static str,
    source: &'static str,
}

impl ShaderTemplate {
    pub const fn new(label: &'static str, source: &'static str) -> Self {
        Self { label, source }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Substitute every placeholder; any placeholder left over is an error.
    pub fn render(&self, substitutions: &[(&str, String)]) -> Result<String, KernelError> {
        let mut source = self.source.to_string();
        for (name, value) in substitutions {
            source = source.replace(&format!("{{{{{}}}}}", name), value);
        }

        if let Some(start) = source.find("{{") {
            let end = source[start..]
                .find("}}")
                .map(|e| start + e + 2)
                .unwrap_or(source.len());
            return Err(KernelError::UnresolvedPlaceholder {
                label: self.label.to_string(),
                placeholder: source[start..end].to_string(),
            });
        }

        Ok(source)
    }
}

/// Parse and validate WGSL without touching a device.
pub fn validate_wgsl(label: &str, source: &str) -> Result<naga::Module, KernelError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| KernelError::Parse {
        label: label.to_string(),
        message: e.emit_to_string(source),
    })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| KernelError::Validation {
        label: label.to_string(),
        message: e.emit_to_string(source),
    })?;

    Ok(module)
}

/// Validate `source` and create a shader module from it.
pub fn compile_wgsl(device: &Device, label: &str, source: &str) -> Result<ShaderModule, KernelError> {
    validate_wgsl(label, source)?;
    log::debug!("Compiled shader '{}'", label);

    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    }))
}

/// Create a compute pipeline with a single bind group.
pub fn create_compute_pipeline(
    device: &Device,
    label: &str,
    module: &ShaderModule,
    layout: &wgpu::BindGroupLayout,
    entry_point: &str,
) -> wgpu::ComputePipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("{}_pipeline_layout", label)),
        bind_group_layouts: &[layout],
        immediate_size: 0,
    });

    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(&format!("{}_pipeline", label)),
        layout: Some(&pipeline_layout),
        module,
        entry_point: Some(entry_point),
        compilation_options: Default::default(),
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kernel_substitutions(format: &str) -> Vec<(&'static str, String)> {
        vec![
            ("WORKGROUP_SIZE", "16".to_string()),
            ("OUTPUT_FORMAT", format.to_string()),
        ]
    }

    #[test]
    fn test_convert_shader_validates() {
        for format in ["rgba8unorm", "bgra8unorm"] {
            let source = ShaderTemplate::new("ycbcr_convert", YCBCR_CONVERT_WGSL)
                .render(&kernel_substitutions(format))
                .unwrap();
            validate_wgsl("ycbcr_convert", &source).unwrap();
        }
    }

    #[test]
    fn test_blur_shader_validates() {
        for format in ["rgba16float", "rgba8unorm", "bgra8unorm"] {
            let source = ShaderTemplate::new("gaussian_blur", GAUSSIAN_BLUR_WGSL)
                .render(&kernel_substitutions(format))
                .unwrap();
            validate_wgsl("gaussian_blur", &source).unwrap();
        }
    }

    #[test]
    fn test_unresolved_placeholder_is_rejected() {
        let result = ShaderTemplate::new("ycbcr_convert", YCBCR_CONVERT_WGSL)
            .render(&[("WORKGROUP_SIZE", "16".to_string())]);
        match result {
            Err(KernelError::UnresolvedPlaceholder { placeholder, .. }) => {
                assert_eq!(placeholder, "{{OUTPUT_FORMAT}}");
            }
            other => panic!("expected unresolved placeholder, got {:?}", other),
        }
    }

    #[test]
    fn test_broken_source_fails_to_parse() {
        let result = validate_wgsl("broken", "fn main( {");
        assert!(matches!(result, Err(KernelError::Parse { .. })));
    }

    #[test]
    fn test_storage_format_names() {
        assert_eq!(
            storage_format_name(TextureFormat::Rgba8Unorm).unwrap(),
            "rgba8unorm"
        );
        assert!(matches!(
            storage_format_name(TextureFormat::R8Unorm),
            Err(KernelError::UnsupportedStorageFormat(_))
        ));
    }
}
