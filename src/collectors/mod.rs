pub mod docker_collector;
pub mod host_collector;

pub use docker_collector::DockerCollector;
pub use host_collector::HostCollector;
