use anyhow::Result;
use callbus::domain::request::StoreInfoRequest;
use callbus::harness::{
    DeadlineSweepJob, DummyResourceHandleProvider, ModuleRunner, RedisCommunicationFactory,
    ReplyListenerJob,
};
use callbus::library::communication::event::InstanceIdentity;
use callbus::library::communication::request::{Request, Requestor, RpcChannel};
use callbus::library::communication::CommunicationFactory;
use callbus::module::store::Store;
use jatsl::{schedule_and_wait, JobScheduler};
use options::{Command, LogFormat, MainOptions, QueryCall, QueryOptions};
use std::time::Duration;
use structopt::StructOpt;
use tracing::info;

mod options;

const SUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    let (command, runner) = init().await?;

    match command {
        Command::Store(options) => runner.run(Store::new(options)).await,
        Command::Query(options) => query(options).await?,
    };

    Ok(())
}

async fn init() -> Result<(Command, ModuleRunner)> {
    let options = MainOptions::from_args();

    let formatter = tracing_subscriber::fmt().with_env_filter(options.log);

    match options.log_format {
        LogFormat::Text => formatter.init(),
        LogFormat::Compact => formatter.compact().init(),
        LogFormat::Json => formatter.json().init(),
    };

    let runner = match options.status_server {
        Some(port) => ModuleRunner::new_with_status_server(port),
        None => ModuleRunner::default(),
    };

    info!("callbus {}", env!("CARGO_PKG_VERSION"));

    Ok((options.command, runner))
}

async fn query(options: QueryOptions) -> Result<()> {
    let timeout = Duration::from_millis(options.timeout_ms);
    let identity = match &options.instance {
        Some(id) => InstanceIdentity::new("query", id),
        None => InstanceIdentity::generate("query"),
    };

    match options.call {
        QueryCall::StoreInfo { store_id } => {
            let request = StoreInfoRequest { store_id };
            let response = issue(&options.redis.url, identity, request, timeout).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}

/// Issues a single request over a throwaway channel
async fn issue<R>(
    redis_url: &str,
    identity: InstanceIdentity,
    request: R,
    timeout: Duration,
) -> Result<R::Response>
where
    R: Request + Send + Sync + 'static,
{
    let channel = RpcChannel::<R>::new(identity);
    let scheduler = JobScheduler::default();

    let listener_job = ReplyListenerJob::new(channel.clone(), redis_url.to_owned());
    let sweep_job = DeadlineSweepJob::new(channel.clone());

    // Blocks until the reply subscription is established, requests must not
    // outrun it
    schedule_and_wait!(scheduler, SUBSCRIBE_TIMEOUT, {
        listener_job,
        sweep_job
    });

    let factory = RedisCommunicationFactory::new(
        redis_url.to_owned(),
        DummyResourceHandleProvider::new(),
    );
    let requestor = channel.requestor(factory.notification_publisher());
    let result = requestor.request(request, timeout).await;

    scheduler.terminate_jobs().await;

    Ok(result?)
}
