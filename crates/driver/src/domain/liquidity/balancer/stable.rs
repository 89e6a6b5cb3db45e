/// Liquidity data tied to a Balancer V2 stable pool.
///
/// These pools are an implementation of Curve.fi StableSwap pools [^1] on the
/// Balancer V2 Vault contract [^2].
///
/// [^1]: <https://classic.curve.fi/whitepaper>
/// [^2]: <https://docs.balancer.fi/products/balancer-pools/composable-stable-pools>
#[derive(Clone, Debug)]
pub struct Pool {}
