// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Containerized GPU experiences.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use bollard::container::{
    Config as ContainerConfig, CreateContainerOptions, InspectContainerOptions,
    KillContainerOptions, ListContainersOptions, StartContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::{DeviceMapping, DeviceRequest, HostConfig};
use bollard::Docker;
use futures_util::StreamExt;
use tokio::sync::{Mutex, OnceCell};

use super::{EnvState, EnvironmentError};
use crate::video_devices::VideoDeviceManager;

/// Shared memory handed to containers; the embedded browser needs more than
/// the 64m docker default.
const SHM_SIZE_BYTES: i64 = 1024 * 1024 * 1024;

pub struct DockerEnvironment {
    id: String,
    image_id: String,
    host_network: bool,
    docker: Option<Docker>,
    video_devices: Arc<VideoDeviceManager>,
    data_dir: PathBuf,
    app_messaging_url: String,
    container_id: Mutex<Option<String>>,
    availability: OnceCell<bool>,
}

impl DockerEnvironment {
    pub fn new(
        id: String,
        image_id: String,
        host_network: bool,
        docker: Option<Docker>,
        video_devices: Arc<VideoDeviceManager>,
        data_dir: PathBuf,
        app_messaging_url: String,
    ) -> Self {
        Self {
            id,
            image_id,
            host_network,
            docker,
            video_devices,
            data_dir,
            app_messaging_url,
            container_id: Mutex::new(None),
            availability: OnceCell::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    pub async fn start(&self) -> Result<(), EnvironmentError> {
        let docker = self.docker()?;
        self.ensure_image(docker).await?;

        let container_name = format!("kiosk-{}", self.id);
        let config = self.container_config();

        let options = Some(CreateContainerOptions { name: container_name.clone(), platform: None });
        let created = docker
            .create_container(options, config)
            .await
            .map_err(|source| self.docker_err(source))?;

        docker
            .start_container(&container_name, None::<StartContainerOptions<String>>)
            .await
            .map_err(|source| self.docker_err(source))?;

        *self.container_id.lock().await = Some(created.id);
        Ok(())
    }

    /// Kill our own container, then sweep every other live container running
    /// the same image so a crashed predecessor can't linger on the GPU.
    pub async fn stop(&self) -> Result<(), EnvironmentError> {
        let docker = self.docker()?;

        if let Some(container_id) = self.container_id.lock().await.take() {
            match docker.kill_container(&container_id, None::<KillContainerOptions<String>>).await {
                Ok(()) => {}
                // Already gone; the sweep below still runs.
                Err(bollard::errors::Error::DockerResponseServerError {
                    status_code: 404 | 409,
                    ..
                }) => {}
                Err(source) => return Err(self.docker_err(source)),
            }
        }

        shutdown_by_tag(docker, &self.image_id).await;
        Ok(())
    }

    pub async fn probe(&self) -> EnvState {
        let Ok(docker) = self.docker() else {
            return EnvState::Failed;
        };
        let container_id = self.container_id.lock().await.clone();
        let Some(container_id) = container_id else {
            return EnvState::Failed;
        };

        match docker.inspect_container(&container_id, None::<InspectContainerOptions>).await {
            Ok(details) => {
                let status = details
                    .state
                    .and_then(|state| state.status)
                    .map(|status| status.to_string())
                    .unwrap_or_default();
                match status.as_str() {
                    "running" | "created" => EnvState::Running,
                    _ => EnvState::Failed,
                }
            }
            Err(_) => EnvState::Failed,
        }
    }

    /// Daemon reachable and image present locally or pullable. The probe is
    /// expensive, so the first answer is memoized for the catalog's lifetime.
    pub async fn available(&self) -> bool {
        *self
            .availability
            .get_or_init(|| async {
                let Ok(docker) = self.docker() else {
                    return false;
                };
                if docker.ping().await.is_err() {
                    return false;
                }
                if docker.inspect_image(&self.image_id).await.is_ok() {
                    return true;
                }
                self.pull_image(docker).await.is_ok()
            })
            .await
    }

    fn docker(&self) -> Result<&Docker, EnvironmentError> {
        self.docker.as_ref().ok_or_else(|| EnvironmentError::Initialization {
            id: self.id.clone(),
            reason: "docker daemon unavailable".to_owned(),
        })
    }

    fn docker_err(&self, source: bollard::errors::Error) -> EnvironmentError {
        EnvironmentError::Docker { id: self.id.clone(), source }
    }

    async fn ensure_image(&self, docker: &Docker) -> Result<(), EnvironmentError> {
        if docker.inspect_image(&self.image_id).await.is_ok() {
            return Ok(());
        }
        self.pull_image(docker).await
    }

    async fn pull_image(&self, docker: &Docker) -> Result<(), EnvironmentError> {
        let options =
            CreateImageOptions { from_image: self.image_id.clone(), ..Default::default() };
        let mut pull = docker.create_image(Some(options), None, None);
        while let Some(progress) = pull.next().await {
            progress.map_err(|source| self.docker_err(source))?;
        }
        Ok(())
    }

    fn container_config(&self) -> ContainerConfig<String> {
        let display = std::env::var("DISPLAY").unwrap_or_else(|_| ":0".to_owned());
        let env = vec![
            format!("DISPLAY={display}"),
            "NVIDIA_DRIVER_CAPABILITIES=all".to_owned(),
            format!("FT_MSG_URL={}", self.app_messaging_url),
        ];

        let data_mount = self.data_dir.join("docker-data").join(sanitize_tag(&self.image_id));
        let binds = vec![
            "/tmp/.X11-unix:/tmp/.X11-unix:rw".to_owned(),
            format!("{}:/data:rw", data_mount.display()),
        ];

        let devices: Vec<DeviceMapping> = self
            .video_devices
            .devices()
            .iter()
            .map(|(name, host_path)| DeviceMapping {
                path_on_host: Some(host_path.display().to_string()),
                path_in_container: Some(format!("/dev/video{name}")),
                cgroup_permissions: Some("rwm".to_owned()),
            })
            .collect();

        let host_config = HostConfig {
            binds: Some(binds),
            device_requests: Some(vec![DeviceRequest {
                driver: Some("nvidia".to_owned()),
                count: Some(-1),
                capabilities: Some(vec![vec!["gpu".to_owned()]]),
                ..Default::default()
            }]),
            devices: (!devices.is_empty()).then_some(devices),
            // The embedded browser needs both of these.
            cap_add: Some(vec!["SYS_ADMIN".to_owned()]),
            shm_size: Some(SHM_SIZE_BYTES),
            network_mode: self.host_network.then(|| "host".to_owned()),
            auto_remove: Some(true),
            ..Default::default()
        };

        ContainerConfig {
            image: Some(self.image_id.clone()),
            env: Some(env),
            host_config: Some(host_config),
            ..Default::default()
        }
    }
}

/// Best-effort kill of every live container running `image`. Used on stop
/// and by the periodic rogue-container sweep.
pub async fn shutdown_by_tag(docker: &Docker, image: &str) {
    let mut filters = HashMap::new();
    filters.insert("ancestor".to_owned(), vec![image.to_owned()]);
    let options = ListContainersOptions { all: false, filters, ..Default::default() };

    let containers = match docker.list_containers(Some(options)).await {
        Ok(containers) => containers,
        Err(err) => {
            tracing::debug!(image, err = %err, "rogue container listing failed");
            return;
        }
    };

    for container in containers {
        let Some(container_id) = container.id else {
            continue;
        };
        match docker.kill_container(&container_id, None::<KillContainerOptions<String>>).await {
            Ok(()) => {
                tracing::info!(image, container = %container_id, "killed rogue container");
            }
            Err(err) => {
                tracing::debug!(image, container = %container_id, err = %err, "rogue kill failed");
            }
        }
    }
}

/// Path-safe rendition of an image tag for the per-image data mount.
fn sanitize_tag(image: &str) -> String {
    image
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

#[cfg(test)]
#[path = "docker_tests.rs"]
mod tests;
