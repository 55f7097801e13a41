use aws_sdk_ec2::Client as Ec2Client;
use aws_sdk_rds::Client as RdsClient;

/// Loads the default AWS credential/region provider chain (`aws-config`'s
/// `from_env`, honoring `AWS_REGION`/`AWS_PROFILE`/instance metadata the
/// same way the rest of the AWS CLI ecosystem does) and builds the two
/// service clients chaos actuators need.
pub async fn load_clients() -> (Ec2Client, RdsClient) {
    let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    (Ec2Client::new(&config), RdsClient::new(&config))
}
